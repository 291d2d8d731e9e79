pub mod virtual_worker_translator;
