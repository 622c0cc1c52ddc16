pub mod broadcast_view;
pub mod refresh_tokens;
