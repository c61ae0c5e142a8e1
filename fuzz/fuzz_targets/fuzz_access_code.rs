//! Fuzz target: `AccessCode::parse` behind the keypad frame assembler
//!
//! Splits arbitrary UART input into frames and validates each one.  Any
//! accepted code must be all digits and exactly the expected length.
//!
//! cargo fuzz run fuzz_access_code

#![no_main]

use accessnode::access_code::AccessCode;
use accessnode::adapters::uart::{FrameAssembler, MAX_FRAME};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&len, stream)) = data.split_first() else {
        return;
    };
    let expected_len = usize::from(len % 17);

    let mut assembler = FrameAssembler::new();
    let mut check = |frame: &[u8]| {
        assert!(!frame.is_empty() && frame.len() <= MAX_FRAME);
        if let Ok(code) = AccessCode::parse(frame, expected_len) {
            assert_eq!(code.as_str().len(), expected_len);
            assert!(code.as_str().bytes().all(|b| b.is_ascii_digit()));
        }
    };
    assembler.feed(stream, &mut check);
    assembler.flush(&mut check);
});
