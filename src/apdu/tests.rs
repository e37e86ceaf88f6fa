use super::{Command, Response, CDF_MAX, RDF_MAX};
use crate::error::Error;

fn cmd(cdf: &[u8], rdf_len: usize) -> Command {
    Command {
        cla: 0x00,
        ins: 0xA4,
        p1: 0x04,
        p2: 0x04,
        cdf: cdf.to_vec(),
        rdf_len,
    }
}

#[test]
fn select_command_encodes_to_the_known_frame() {
    let c = cmd(b"Test", 256);
    assert_eq!(c.encoded_len().unwrap(), 10);
    let frame = c.encode().unwrap();
    assert_eq!(hex::encode_upper(&frame), "00A40404045465737400");
    assert_eq!(Command::decode(&frame).unwrap(), c);
}

#[test]
fn response_frame_carries_data_then_status() {
    let r = Response {
        sw1: 0x90,
        sw2: 0x00,
        rdf: vec![0xE0; 20],
    };
    let frame = r.encode().unwrap();
    assert_eq!(frame.len(), 22);
    assert_eq!(&frame[..20], &[0xE0; 20][..]);
    assert_eq!(&frame[20..], &[0x90, 0x00]);
    assert_eq!(Response::decode(&frame).unwrap(), r);
}

#[test]
fn field_bounds_are_enforced() {
    assert!(matches!(
        cmd(&vec![0; CDF_MAX + 1], 0).check(),
        Err(Error::BadInput { .. })
    ));
    assert!(matches!(
        cmd(&[], RDF_MAX + 1).encode(),
        Err(Error::BadInput { .. })
    ));
    let r = Response {
        sw1: 0x90,
        sw2: 0x00,
        rdf: vec![0; RDF_MAX + 1],
    };
    assert!(matches!(r.encode(), Err(Error::BadInput { .. })));
}

#[test]
fn every_length_pair_round_trips_through_a_distinct_frame() {
    use std::collections::HashSet;
    let data = [0xB7u8; CDF_MAX];
    let mut seen = HashSet::new();
    for cdf_len in 0..=CDF_MAX {
        for rdf_len in 0..=RDF_MAX {
            let c = cmd(&data[..cdf_len], rdf_len);
            let frame = c.encode().unwrap();
            assert_eq!(frame.len(), c.encoded_len().unwrap());
            assert_eq!(Command::decode(&frame).unwrap(), c, "{cdf_len}/{rdf_len}");
            assert!(seen.insert(frame), "{cdf_len}/{rdf_len} frame collided");
        }
    }
}

#[test]
fn extended_form_kicks_in_exactly_at_the_short_limits() {
    // 255-octet data with Le 256 still fits the short form
    let frame = cmd(&[0xAA; 255], 256).encode().unwrap();
    assert_eq!(frame.len(), 4 + 1 + 255 + 1);
    assert_eq!(frame[4], 255);
    assert_eq!(*frame.last().unwrap(), 0x00);

    // one more data octet forces the extended form throughout
    let frame = cmd(&[0xAA; 256], 256).encode().unwrap();
    assert_eq!(frame.len(), 4 + 3 + 256 + 2);
    assert_eq!(&frame[4..7], &[0x00, 0x01, 0x00]);
    assert_eq!(&frame[frame.len() - 2..], &[0x01, 0x00]);

    // Le 257 alone forces it too
    let frame = cmd(&[], 257).encode().unwrap();
    assert_eq!(frame, [0x00, 0xA4, 0x04, 0x04, 0x00, 0x01, 0x01]);
}

#[test]
fn malformed_frames_are_rejected() {
    assert!(matches!(
        Command::decode(&[0x00, 0xA4, 0x04]),
        Err(Error::BadFormat { .. })
    ));
    // lc claims more data than the body holds
    assert!(matches!(
        Command::decode(&[0x00, 0xA4, 0x04, 0x04, 0x05, 0x01]),
        Err(Error::BadFormat { .. })
    ));
    // extended lc of zero
    assert!(matches!(
        Command::decode(&[0x00, 0xA4, 0x04, 0x04, 0x00, 0x00, 0x00, 0x01]),
        Err(Error::BadFormat { .. })
    ));
    // extended Le that belongs in the short form
    assert!(matches!(
        Command::decode(&[0x00, 0xA4, 0x04, 0x04, 0x00, 0x00, 0x10]),
        Err(Error::BadFormat { .. })
    ));
    assert!(matches!(
        Response::decode(&[0x90]),
        Err(Error::BadFormat { .. })
    ));
    assert!(matches!(
        Response::decode(&vec![0u8; RDF_MAX + 3]),
        Err(Error::BadFormat { .. })
    ));
}
