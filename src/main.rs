fn main() {
    mm15::term::main()
}
