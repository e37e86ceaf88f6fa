use super::*;
use crate::apdu::{Command, Response, CDF_MAX, RDF_MAX};
use crate::crypto::Aes256;
use crate::error::Error;

const KEY: [u8; 32] = [
    0xE9, 0xDE, 0xE7, 0x2C, 0x8F, 0x0C, 0x0F, 0xA6, 0x2D, 0xDB, 0x49, 0xF4, 0x6F, 0x73, 0x96,
    0x47, 0x06, 0x07, 0x53, 0x16, 0xED, 0x24, 0x7A, 0x37, 0x39, 0xCB, 0xA3, 0x83, 0x03, 0xA9,
    0x8B, 0xF6,
];

fn session() -> SmState<Aes256> {
    SmState::new(&KEY).unwrap()
}

fn select(cdf: &[u8], rdf_len: usize) -> Command {
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
fn key_length_is_checked() {
    assert!(matches!(
        SmState::<Aes256>::new(&KEY[..31]),
        Err(Error::BadInput { .. })
    ));
}

#[test]
fn protected_overheads_match_the_unprotected_baseline() {
    let sm = session();
    let cmd = select(b"Test", 256);
    assert_eq!(cmd.encode().unwrap().len(), 10);
    let frame = sm.cmd_wrap(&cmd).unwrap();
    assert_eq!(frame.len(), 26);
    assert_eq!(sm.cmd_wrap_len(&cmd).unwrap(), 26);
    assert_eq!(frame[0], 0x04);
    assert_eq!(sm.cmd_unwrap(&frame).unwrap(), cmd);

    let resp = Response {
        sw1: 0x90,
        sw2: 0x00,
        rdf: vec![0xE0; 20],
    };
    assert_eq!(resp.encode().unwrap().len(), 22);
    let frame = sm.resp_wrap(&resp).unwrap();
    assert_eq!(frame.len(), 35);
    assert_eq!(sm.resp_wrap_len(&resp).unwrap(), 35);
    assert_eq!(sm.resp_unwrap(&frame).unwrap(), resp);
}

#[test]
fn passthrough_helpers_fall_back_to_the_unprotected_codec() {
    let cmd = select(b"Test", 256);
    let frame = cmd_wrap::<Aes256>(&cmd, None).unwrap();
    assert_eq!(hex::encode_upper(&frame), "00A40404045465737400");
    assert_eq!(cmd_unwrap::<Aes256>(&frame, None).unwrap(), cmd);

    let sm = session();
    let frame = cmd_wrap(&cmd, Some(&sm)).unwrap();
    assert_eq!(cmd_unwrap(&frame, Some(&sm)).unwrap(), cmd);

    let resp = Response {
        sw1: 0x6A,
        sw2: 0x82,
        rdf: Vec::new(),
    };
    let frame = resp_wrap::<Aes256>(&resp, None).unwrap();
    assert_eq!(frame, [0x6A, 0x82]);
    assert_eq!(resp_unwrap::<Aes256>(&frame, None).unwrap(), resp);
    let frame = resp_wrap(&resp, Some(&sm)).unwrap();
    assert_eq!(resp_unwrap(&frame, Some(&sm)).unwrap(), resp);
}

#[test]
fn every_length_pair_round_trips_protected_in_lock_step() {
    let data = [0x36u8; CDF_MAX];
    let mut t = session();
    let mut ct = session();
    for cdf_len in 0..=CDF_MAX {
        for rdf_len in 0..=RDF_MAX {
            let cmd = select(&data[..cdf_len], rdf_len);
            let frame = t.cmd_wrap(&cmd).unwrap();
            assert_eq!(frame.len(), t.cmd_wrap_len(&cmd).unwrap());
            assert_eq!(ct.cmd_unwrap(&frame).unwrap(), cmd, "{cdf_len}/{rdf_len}");
            t.ctr_inc();
            ct.ctr_inc();

            let resp = Response {
                sw1: 0x90,
                sw2: 0x00,
                rdf: data[..rdf_len].to_vec(),
            };
            let frame = ct.resp_wrap(&resp).unwrap();
            assert_eq!(frame.len(), ct.resp_wrap_len(&resp).unwrap());
            assert_eq!(t.resp_unwrap(&frame).unwrap(), resp);
            t.ctr_inc();
            ct.ctr_inc();
        }
    }
}

#[test]
fn full_unprotected_grid_round_trips() {
    let data = [0x5Au8; CDF_MAX];
    for cdf_len in 0..=CDF_MAX {
        for rdf_len in 0..=RDF_MAX {
            let cmd = select(&data[..cdf_len], rdf_len);
            let frame = cmd_wrap::<Aes256>(&cmd, None).unwrap();
            assert_eq!(cmd_unwrap::<Aes256>(&frame, None).unwrap(), cmd);
        }
    }
}

#[test]
fn skipped_counter_increment_fails_authentication() {
    let mut t = session();
    let ct = session();
    let cmd = select(b"Test", 0);
    t.ctr_inc();
    let frame = t.cmd_wrap(&cmd).unwrap();
    assert!(matches!(
        ct.cmd_unwrap(&frame),
        Err(Error::BadSig { .. })
    ));
}

#[test]
fn tampering_fails_authentication_before_decryption() {
    let sm = session();
    let cmd = select(b"Test", 256);
    let good = sm.cmd_wrap(&cmd).unwrap();
    for i in 0..good.len() - 1 {
        let mut bad = good.clone();
        bad[i] ^= 0x01;
        assert!(sm.cmd_unwrap(&bad).is_err(), "octet {i} flip accepted");
    }

    let resp = Response {
        sw1: 0x90,
        sw2: 0x00,
        rdf: b"hello".to_vec(),
    };
    let good = sm.resp_wrap(&resp).unwrap();
    let mut bad = good.clone();
    let n = bad.len();
    // flipping a status octet must break the tag
    bad[n - 1] ^= 0x01;
    assert!(matches!(
        sm.resp_unwrap(&bad),
        Err(Error::BadSig { .. })
    ));
}

#[test]
fn truncated_frames_are_structural_errors() {
    let sm = session();
    let cmd = select(b"Test", 256);
    let good = sm.cmd_wrap(&cmd).unwrap();
    for n in 0..good.len() {
        assert!(matches!(
            sm.cmd_unwrap(&good[..n]),
            Err(Error::BadFormat { .. }) | Err(Error::BadSig { .. })
        ));
    }
    let resp = Response {
        sw1: 0x90,
        sw2: 0x00,
        rdf: b"hello".to_vec(),
    };
    let good = sm.resp_wrap(&resp).unwrap();
    assert!(matches!(
        sm.resp_unwrap(&good[..DO8E_LEN + 1]),
        Err(Error::BadFormat { .. }) | Err(Error::BadSig { .. })
    ));
}

#[test]
fn unprotected_frames_do_not_pass_as_protected() {
    let sm = session();
    let frame = select(b"Test", 256).encode().unwrap();
    assert!(matches!(
        sm.cmd_unwrap(&frame),
        Err(Error::BadFormat { .. })
    ));
}
