//! メッセージ送信（通知）の実装
//!
//! ## 概要
//!
//! このモジュールは `MessagePusher` trait の具体的な実装を提供します。
//!
//! ## 実装
//!
//! - `registry`: 接続スロット表（`ViewerRegistry`）の送信キューに配る実装

pub mod registry;

pub use registry::RegistryMessagePusher;
