/// Format of the `recorded_at` form field (`datetime-local` input)
pub const RECORDED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Archive entry reserved for import metadata; never extracted as a file
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// URL prefix under which the storage root is served
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Where the browser lands after an upload or import
pub const FILES_PAGE: &str = "/files";
