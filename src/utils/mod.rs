//! Вспомогательные модули: временные файлы и запуск внешних утилит

pub mod process;
pub mod temp;
