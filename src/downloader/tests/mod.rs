//! Downloader tests grouped by concern.
