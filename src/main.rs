fn main() {
    paste_rtc_lib::run()
}
