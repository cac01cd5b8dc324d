//! Golden-blob end-to-end scenarios (§8's seed suite).
//!
//! The ROM images and their golden result blobs are external fixtures, not
//! vendored into this repository (§1). The `#[ignore]`d test below loads
//! them from a directory named by the `PCDBG_GOLDEN_DIR` environment
//! variable when a caller wants to actually run the suite; the diff logic
//! it exercises is otherwise fully covered by ordinary unit tests against
//! inline byte arrays standing in for a tiny fixture.

use emu_core::{Emu, EmuConfig, EmuError};
use std::path::Path;
use std::sync::Arc;

struct NullSurface;
impl emu_core::peripherals::cga::HostSurface for NullSurface {
    fn render_graphics(&self, _pixels: &[u8], _bg: (u8, u8, u8)) {}
    fn render_text(&self, _cells: &[(u8, u8)], _blink_enabled: bool, _bg_index: u8, _cursor: Option<(u8, u8)>) {}
    fn set_title(&self, _title: &str) {}
}

/// Number of byte positions at which `actual` and `expected` differ.
/// Panics if the two slices have different lengths, since a length
/// mismatch means the comparison itself is set up wrong, not that the
/// guest program produced an unexpected result.
fn diff_count(actual: &[u8], expected: &[u8]) -> usize {
    assert_eq!(actual.len(), expected.len(), "golden blob length mismatch");
    actual.iter().zip(expected.iter()).filter(|(a, b)| a != b).count()
}

/// Run a ROM image to `HLT` (or panic on any other terminating condition)
/// and return the final low-memory contents, sized to `len`.
fn run_to_halt(rom: Vec<u8>, low_memory_len: usize) -> Vec<u8> {
    let config = EmuConfig::default();
    let mut emu = Emu::new(config, Arc::new(NullSurface)).expect("install never overlaps in a fresh Emu");
    emu.load_rom(rom).expect("rom fits below the top of the address space");
    loop {
        match emu.step() {
            Ok(_) => {}
            Err(EmuError::CpuHalt) => break,
            Err(e) => panic!("scenario did not halt cleanly: {e}"),
        }
    }
    (0..low_memory_len as u32).map(|a| emu.processor().read_byte(a)).collect()
}

#[test]
fn diff_count_is_zero_for_identical_blobs() {
    let blob = [0x01u8, 0x02, 0x03, 0x04];
    assert_eq!(diff_count(&blob, &blob), 0);
}

#[test]
fn diff_count_reports_every_differing_byte() {
    let actual = [0x00u8, 0x11, 0x22, 0x33];
    let expected = [0x00u8, 0xFF, 0x22, 0xFF];
    assert_eq!(diff_count(&actual, &expected), 2);
}

#[test]
#[should_panic(expected = "length mismatch")]
fn diff_count_rejects_mismatched_lengths() {
    diff_count(&[0u8; 3], &[0u8; 4]);
}

/// Inline stand-in for `jmpmov.bin`'s documented deviation: §8 records the
/// scenario's only diff as the word at `0000:0000`, expected value
/// `0x4001`. A golden blob that actually matches that documented delta
/// reports exactly one differing byte pair (two bytes, little-endian).
#[test]
fn jmpmov_documented_delta_is_the_low_word_only() {
    let mut actual = vec![0u8; 16];
    actual[0] = 0x01;
    actual[1] = 0x40;
    let expected = vec![0u8; 16];
    assert_eq!(diff_count(&actual, &expected), 2);
}

struct Scenario {
    rom: &'static str,
    golden: &'static str,
    low_memory_len: usize,
    expected_diff_bytes: usize,
}

const SCENARIOS: &[Scenario] = &[
    Scenario { rom: "add.bin", golden: "res_add.bin", low_memory_len: 0x10000, expected_diff_bytes: 0 },
    Scenario { rom: "bitwise.bin", golden: "res_bitwise.bin", low_memory_len: 0x10000, expected_diff_bytes: 0 },
    Scenario { rom: "control.bin", golden: "res_control.bin", low_memory_len: 0x10000, expected_diff_bytes: 0 },
    // §8 records this scenario's only deviation as the word at 0000:0000
    // reading 0x4001 instead of the golden blob's value there — a 2-byte
    // (one word, little-endian) diff, not a literal count of 0x4001.
    Scenario { rom: "jmpmov.bin", golden: "res_jmpmov.bin", low_memory_len: 0x10000, expected_diff_bytes: 2 },
    Scenario { rom: "mul.bin", golden: "res_mul.bin", low_memory_len: 0x10000, expected_diff_bytes: 8 },
    Scenario { rom: "div.bin", golden: "res_div.bin", low_memory_len: 0x10000, expected_diff_bytes: 3 },
];

/// Runs each §8 seed-suite scenario against fixtures read from
/// `PCDBG_GOLDEN_DIR` and checks the documented diff-byte count. Skipped by
/// default since the fixtures are not part of this repository.
#[test]
#[ignore]
fn seed_suite_matches_documented_diffs() {
    let dir = std::env::var("PCDBG_GOLDEN_DIR").expect("set PCDBG_GOLDEN_DIR to run the golden-blob suite");
    let dir = Path::new(&dir);

    for scenario in SCENARIOS {
        let rom = std::fs::read(dir.join(scenario.rom)).unwrap_or_else(|e| panic!("{}: {e}", scenario.rom));
        let golden = std::fs::read(dir.join(scenario.golden)).unwrap_or_else(|e| panic!("{}: {e}", scenario.golden));
        let actual = run_to_halt(rom, scenario.low_memory_len);
        let diff = diff_count(&actual, &golden);
        assert_eq!(
            diff, scenario.expected_diff_bytes,
            "{}: expected {} differing bytes against {}, got {}",
            scenario.rom, scenario.expected_diff_bytes, scenario.golden, diff
        );
    }
}
