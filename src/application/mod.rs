// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Coordinates the other layers to reach one goal: train a
// model, or answer with one.
//
// Rules for this layer:
//   - No tensor code here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Identity and lifecycle of one model
pub mod model_instance;

// The training workflow
pub mod train_use_case;

// The inference workflow
pub mod predict_use_case;
