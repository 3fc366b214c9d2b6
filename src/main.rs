fn main() {
  mindful_moments_lib::run()
}
