#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(state) = autoz_config::PersistedState::from_toml(data) {
        if state.check_range(-5.0, 0.0).is_ok() {
            // anything in range must survive a write/read cycle
            let text = state.to_toml().unwrap();
            let back = autoz_config::PersistedState::from_toml(&text).unwrap();
            assert_eq!(back.boot_step, state.boot_step);
        }
    }
});
