use std::io::Write;

hal_fn_impl! {
    impl mod crate::hal_fn::serial {
        fn serial_put(c: u8) {
            let _ = std::io::stderr().write_all(&[c]);
        }
    }
}
