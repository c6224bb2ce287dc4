//! Shared constants for end-to-end tests

// ============================================================================
// Fake Origin Assets
// ============================================================================

/// Asset served by the fake origin as a 30 second track
pub const ASSET_1_ID: &str = "123";

/// Second regular asset
pub const ASSET_2_ID: &str = "456";

/// Asset the fake origin answers with 404
pub const MISSING_ASSET_ID: &str = "404404";

/// Asset whose bytes the fake toolkit cannot probe
pub const CORRUPT_ASSET_ID: &str = "666";

/// Body served for regular assets
pub const FAKE_AUDIO_BYTES: &[u8] = b"ID3\x04\x00fake-audio-payload";

/// Body served for the corrupt asset
pub const CORRUPT_AUDIO_BYTES: &[u8] = b"corrupt";

// ============================================================================
// Fake Toolkit Output
// ============================================================================

/// Duration reported by the fake ffprobe
pub const TEST_DURATION_SECS: f64 = 30.0;

/// Windows expected for TEST_DURATION_SECS
pub const TEST_WINDOW_COUNT: usize = 300;

/// Report printed by the fake ffmpeg for every window
pub const FIXED_LOUDNESS_REPORT: &str = "\
[Parsed_astats_0 @ 0x1] Channel: 1
[Parsed_astats_0 @ 0x1] Peak level dB: -10.000000
[Parsed_astats_0 @ 0x1] RMS level dB: -20.000000
";

/// Linear amplitude of -20 dB
pub const EXPECTED_AMPLITUDE: f64 = 0.1;

/// Linear peak of -10 dB, rounded to 4 decimals
pub const EXPECTED_PEAK: f64 = 0.3162;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
