fn main() {
    lung_lens_lib::run()
}
