#![no_main]
use libfuzzer_sys::fuzz_target;
use mhd_stream::{rewrite_field, Field, MhdHeader};

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = MhdHeader::from_bytes(data) {
        let _ = header.payload_len();
        let written = header.to_bytes();
        assert_eq!(MhdHeader::from_bytes(&written).ok().map(|h| h.dim_size), Some(header.dim_size.clone()));
        for field in &[Field::DimSize, Field::Offset, Field::ElementSpacing] {
            let _ = rewrite_field(data, *field, &[1.5, -2.]);
        }
    }
});
