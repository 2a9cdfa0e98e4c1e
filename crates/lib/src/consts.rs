//! Names and defaults shared across the crate.

/// Default name of the file that turns a directory into a package.
pub const BUILD_FILE_NAME: &str = "BUILD";

/// Workspace-level configuration file, read from the workspace root.
pub const CONFIG_FILE_NAME: &str = "buildmark.toml";

/// Overrides the package path (platform path-list syntax).
pub const ENV_PACKAGE_PATH: &str = "BUILDMARK_PACKAGE_PATH";

/// Overrides the number of evaluation worker threads.
pub const ENV_PARALLELISM: &str = "BUILDMARK_PARALLELISM";

/// Reason attached to lookups of packages listed in `deleted_packages`.
pub const DELETED_PACKAGE_REASON: &str = "Package is considered deleted due to --deleted_packages";
