#![no_main]

use libfuzzer_sys::fuzz_target;
use wirebin::Generator;
use wirebin_fuzz::Sample;

fuzz_target!(|data: &[u8]| {
    let generator = Generator::new();
    if let Ok(sample) = generator.decode::<Sample>(data) {
        // Whatever decodes must survive a second trip, even if the input held unknown fields.
        let encoded = generator.encode(&sample).unwrap();
        assert_eq!(sample, generator.decode::<Sample>(&encoded).unwrap());
    }
});
