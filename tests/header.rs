#[macro_use]
extern crate pretty_assertions;

use mhd_stream::{rewrite_field, ElementType, Endianness, Field, MhdError, MhdHeader};

mod util;

use util::big_endian_header_gt;

#[test]
fn big_endian_mhd() {
    const FILE_NAME: &str = "resources/big_endian.mhd";
    let header = MhdHeader::from_file(FILE_NAME).unwrap();
    assert_eq!(header, big_endian_header_gt());
    assert_eq!(header.bytes_per_voxel(), 2);
    assert_eq!(header.payload_len(), 24);
}

#[test]
fn written_header_reads_back() {
    let header = MhdHeader::new(
        vec![1000, 100, 10],
        vec![0., 2.2, 6.6000000000000005],
        vec![1.1, 2.2, 3.3],
        3,
        ElementType::Float32,
        "scenario.raw",
    );
    let bytes = header.to_bytes();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.starts_with("ObjectType = Image\nNDims = 3\n"));
    assert!(text.contains("\nDimSize = 1000 100 10\n"));
    assert!(text.contains("\nElementNumberOfChannels = 3\n"));
    assert!(text.contains("\nElementType = MET_FLOAT\n"));
    assert!(text.ends_with("ElementDataFile = scenario.raw\n"));

    let back = MhdHeader::from_bytes(&bytes).unwrap();
    assert_eq!(back, header);
    assert_eq!(back.endianness, Endianness::Little);
}

#[test]
fn rewrite_keeps_other_lines() {
    let text = b"NDims = 3\r\nOffset = 0 0 0\r\nDimSize = 1 1 1\r\nElementType = MET_UCHAR";
    let out = rewrite_field(text, Field::DimSize, &[64, 32, 16]).unwrap();
    assert_eq!(
        String::from_utf8(out.clone()).unwrap(),
        "NDims = 3\r\nOffset = 0 0 0\r\nDimSize = 64 32 16\r\nElementType = MET_UCHAR"
    );

    let out = rewrite_field(&out, Field::Offset, &[1.5, -2., 0.25]).unwrap();
    let header = MhdHeader::from_bytes(&out).unwrap();
    assert_eq!(header.offset, vec![1.5, -2., 0.25]);
    assert_eq!(header.dim_size, vec![64, 32, 16]);
    assert_eq!(header.element_spacing, vec![1., 1., 1.]);

    // last line without terminator
    let out = rewrite_field(b"NDims = 1\nElementSpacing = 3", Field::ElementSpacing, &[0.5]).unwrap();
    assert_eq!(out, b"NDims = 1\nElementSpacing = 0.5".to_vec());
}

#[test]
fn rewrite_missing_field() {
    let text = b"NDims = 2\nOrigin = 1 1\nDimSize = 2 2\n";
    match rewrite_field(text, Field::Offset, &[0., 0.]) {
        Err(MhdError::FieldNotFound(name)) => assert_eq!(name, "Offset"),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn invalid_headers() {
    let cases: &[&[u8]] = &[
        b"DimSize = 2 2\nElementType = MET_UCHAR\n",
        b"NDims = 2\nElementType = MET_UCHAR\n",
        b"NDims = 2\nDimSize = 2 2\n",
        b"NDims = 2\nDimSize = 2 2 2\nElementType = MET_UCHAR\n",
        b"NDims = 2\nDimSize = 2 two\nElementType = MET_UCHAR\n",
        b"NDims = 2\nDimSize = 2 2\nElementType = MET_COMPLEX\n",
        b"NDims = 0\nDimSize =\nElementType = MET_UCHAR\n",
        b"NDims = 2\nDimSize 2 2\nElementType = MET_UCHAR\n",
        b"NDims = 2\nDimSize = 2 2\nBinaryDataByteOrderMSB = maybe\nElementType = MET_UCHAR\n",
    ];
    for case in cases {
        let r = MhdHeader::from_bytes(case);
        assert!(
            matches!(r, Err(MhdError::MalformedHeader(_))),
            "{:?} gave {:?}",
            String::from_utf8_lossy(case),
            r
        );
    }
}

#[test]
fn missing_header_file() {
    let r = MhdHeader::from_file("resources/does_not_exist.mhd");
    assert!(matches!(r, Err(MhdError::FileIo { .. })));
}
