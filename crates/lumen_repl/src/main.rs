fn main() {
    lumen_repl::run();
}
