use std::time::{Duration, Instant};

lazy_static::lazy_static! {
    static ref START: Instant = Instant::now();
}

hal_fn_impl! {
    impl mod crate::hal_fn::timer {
        fn timer_now() -> Duration {
            START.elapsed()
        }
    }
}
