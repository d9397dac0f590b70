//! Platform-aware time utilities.
//!
//! On native platforms, this uses `chrono::Utc::now()`.
//! On WASM, this uses `js_sys::Date::now()` since `std::time::SystemTime`
//! is not available on `wasm32-unknown-unknown`. The choice is made at
//! compile time; nothing inspects the environment at runtime.

/// Returns the current Unix timestamp in milliseconds.
pub fn now_timestamp_millis() -> i64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as i64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Returns the current Unix timestamp in microseconds.
///
/// WASM only has millisecond wall-clock resolution.
pub fn now_timestamp_micros() -> i64 {
    #[cfg(target_arch = "wasm32")]
    {
        (js_sys::Date::now() * 1000.0) as i64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        chrono::Utc::now().timestamp_micros()
    }
}

/// Measures elapsed wall time for latency telemetry.
///
/// Native builds use the monotonic `Instant`; WASM falls back to `Date.now()`.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    start: std::time::Instant,
    #[cfg(target_arch = "wasm32")]
    start: f64,
}

impl Stopwatch {
    /// Start measuring now
    pub fn start() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            start: std::time::Instant::now(),
            #[cfg(target_arch = "wasm32")]
            start: js_sys::Date::now(),
        }
    }

    /// Milliseconds since `start`, with sub-millisecond precision where available
    pub fn elapsed_ms(&self) -> f64 {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.start.elapsed().as_secs_f64() * 1000.0
        }
        #[cfg(target_arch = "wasm32")]
        {
            (js_sys::Date::now() - self.start).max(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_timestamp_millis_is_reasonable() {
        let ts = now_timestamp_millis();
        // Should be after 2024-01-01 in millis
        assert!(ts > 1704067200_000, "Timestamp {} is too old", ts);
        // Should be before 2100-01-01
        assert!(ts < 4102444800_000, "Timestamp {} is too far in future", ts);
    }

    #[test]
    fn test_micros_agree_with_millis() {
        let millis = now_timestamp_millis();
        let micros = now_timestamp_micros();
        assert!((micros / 1000 - millis).abs() < 1_000);
    }

    #[test]
    fn test_stopwatch_measures_sleep() {
        let watch = Stopwatch::start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let elapsed = watch.elapsed_ms();
        assert!(elapsed >= 5.0, "elapsed {} ms", elapsed);
        assert!(elapsed < 5_000.0);
    }
}
