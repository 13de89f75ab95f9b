// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// user-facing goal each.
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No printing here (that's Layer 1)
//   - File access only through Layer 4 and Layer 6 types
//   - Only workflow coordination

// Write a validated embedder config to disk
pub mod init_config_use_case;

// Encode a padded index batch into features
pub mod encode_use_case;

// Describe the embedder a config builds
pub mod inspect_use_case;
