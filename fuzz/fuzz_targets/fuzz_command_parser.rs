#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // The console command grammar must reject arbitrary input without
    // panicking; accepted values must already satisfy the positivity rule.
    if let Ok(Some(filawatch_core::command::OperatorCommand::SetFilamentMotionDetectLength(v))) =
        filawatch_core::command::parse(data)
    {
        assert!(v.is_finite() && v > 0.0);
    }
});
