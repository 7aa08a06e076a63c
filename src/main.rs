fn main() {
    help_me_fast_lib::run()
}
