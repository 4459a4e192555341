#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Fuzz TOML parsing of Config: invalid input must be rejected gracefully,
    // never by panicking.
    let parsed = toml::from_str::<filawatch_config::Config>(data);
    match parsed {
        Ok(cfg) => {
            // Ensure validate() does not panic either
            let _ = cfg.validate();
        }
        Err(_e) => {
            // parse error is acceptable
        }
    }
});
