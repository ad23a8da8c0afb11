//! Immutable lookup tables from ISO/IEC 14496-3.

/// Sampling frequencies by `samplingFrequencyIndex` (Table 1.18).
///
/// Indices 0xD and 0xE are reserved, 0xF escapes to an explicit 24-bit rate.
pub static SAMPLING_FREQUENCIES: [Option<u32>; 16] = [
    Some(96_000),
    Some(88_200),
    Some(64_000),
    Some(48_000),
    Some(44_100),
    Some(32_000),
    Some(24_000),
    Some(22_050),
    Some(16_000),
    Some(12_000),
    Some(11_025),
    Some(8_000),
    Some(7_350),
    None,
    None,
    None,
];

/// Escape value of `samplingFrequencyIndex`.
pub const SAMPLING_FREQUENCY_ESCAPE: u8 = 0xF;

/// Escape value of the 5-bit `audioObjectType`.
pub const OBJECT_TYPE_ESCAPE: u8 = 31;

pub fn sampling_frequency(index: u8) -> Option<u32> {
    SAMPLING_FREQUENCIES.get(index as usize).copied().flatten()
}

/// Channel count by `channelConfiguration`, `None` when reserved or defined
/// by a program config element (0).
pub static CHANNEL_COUNTS: [Option<u8>; 16] = [
    None,
    Some(1),
    Some(2),
    Some(3),
    Some(4),
    Some(5),
    Some(6),
    Some(8),
    None,
    None,
    None,
    Some(7),
    Some(8),
    Some(24),
    Some(8),
    None,
];

pub fn channel_count(configuration: u8) -> Option<u8> {
    CHANNEL_COUNTS.get(configuration as usize).copied().flatten()
}

#[rustfmt::skip]
pub static CHANNEL_LAYOUTS: [&str; 16] = [
    /* 0 */ "program config",
    /* 1 */ "mono",
    /* 2 */ "stereo",
    /* 3 */ "3.0",
    /* 4 */ "4.0",
    /* 5 */ "5.0",
    /* 6 */ "5.1",
    /* 7 */ "7.1",
    /* 8 */ "reserved",
    /* 9 */ "reserved",
    /* 10 */ "reserved",
    /* 11 */ "6.1",
    /* 12 */ "7.1 rear",
    /* 13 */ "22.2",
    /* 14 */ "7.1 top",
    /* 15 */ "reserved",
];

/// Audio object type names (Table 1.17), indexed by object type id.
#[rustfmt::skip]
pub static OBJECT_TYPE_NAMES: [&str; 46] = [
    /* 0 */ "Null",
    /* 1 */ "AAC Main",
    /* 2 */ "AAC LC",
    /* 3 */ "AAC SSR",
    /* 4 */ "AAC LTP",
    /* 5 */ "SBR",
    /* 6 */ "AAC Scalable",
    /* 7 */ "TwinVQ",
    /* 8 */ "CELP",
    /* 9 */ "HVXC",
    /* 10 */ "Reserved",
    /* 11 */ "Reserved",
    /* 12 */ "TTSI",
    /* 13 */ "Main Synthetic",
    /* 14 */ "Wavetable Synthesis",
    /* 15 */ "General MIDI",
    /* 16 */ "Algorithmic Synthesis and Audio FX",
    /* 17 */ "ER AAC LC",
    /* 18 */ "Reserved",
    /* 19 */ "ER AAC LTP",
    /* 20 */ "ER AAC Scalable",
    /* 21 */ "ER TwinVQ",
    /* 22 */ "ER BSAC",
    /* 23 */ "ER AAC LD",
    /* 24 */ "ER CELP",
    /* 25 */ "ER HVXC",
    /* 26 */ "ER HILN",
    /* 27 */ "ER Parametric",
    /* 28 */ "SSC",
    /* 29 */ "PS",
    /* 30 */ "MPEG Surround",
    /* 31 */ "Escape",
    /* 32 */ "Layer-1",
    /* 33 */ "Layer-2",
    /* 34 */ "Layer-3",
    /* 35 */ "DST",
    /* 36 */ "ALS",
    /* 37 */ "SLS",
    /* 38 */ "SLS non-core",
    /* 39 */ "ER AAC ELD",
    /* 40 */ "SMR Simple",
    /* 41 */ "SMR Main",
    /* 42 */ "USAC (no SBR)",
    /* 43 */ "SAOC",
    /* 44 */ "LD MPEG Surround",
    /* 45 */ "USAC",
];

pub fn object_type_name(object_type: u8) -> &'static str {
    OBJECT_TYPE_NAMES
        .get(object_type as usize)
        .copied()
        .unwrap_or("Reserved")
}

/// ADTS `profile` names for MPEG-2 (ID = 1) streams.
pub static MPEG2_PROFILE_NAMES: [&str; 4] = ["Main", "LC", "SSR", "Reserved"];

#[test]
fn table_lookups() {
    assert_eq!(sampling_frequency(4), Some(44_100));
    assert_eq!(sampling_frequency(0xC), Some(7_350));
    assert_eq!(sampling_frequency(0xD), None);
    assert_eq!(sampling_frequency(0x20), None);
    assert_eq!(channel_count(7), Some(8));
    assert_eq!(channel_count(0), None);
    assert_eq!(object_type_name(2), "AAC LC");
    assert_eq!(object_type_name(37), "SLS");
    assert_eq!(object_type_name(99), "Reserved");
}
