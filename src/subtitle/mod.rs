//! Модуль для работы с субтитрами
//!
//! Разбор SRT, модель таймлайна и расчет пауз и окон речи.

pub mod analyzer;
pub mod parser;
pub mod timeline;
pub mod windows;

pub use timeline::{Cue, Timeline, TimelineDefect};
pub use windows::{compute_windows, TimelineWindow};
