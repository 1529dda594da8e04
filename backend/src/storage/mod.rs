pub mod drive_service;
