//! Well-known file names, arguments and environment keys.

/// Project manifest; a directory holding it is a project.
pub const MANIFEST_FILE: &str = "platformio.ini";

/// Marker file that opts a directory out of discovery.
pub const SKIP_MARKER_FILE: &str = ".skiptest";

/// Name of the examples directory inside the repository and inside each platform package.
pub const EXAMPLES_DIR: &str = "examples";

/// Capitalised spelling some platform packages ship instead of [`EXAMPLES_DIR`].
pub const EXAMPLES_DIR_ALT: &str = "Examples";

/// Platform package manifest read by the registry.
pub const PLATFORM_MANIFEST_FILE: &str = "platform.json";

/// Package type that marks a platform as embedded (it can flash a device).
pub const UPLOADER_PACKAGE_TYPE: &str = "uploader";

/// Default build tool program name.
pub const BUILD_PROGRAM: &str = "platformio";

/// Build tool subcommand.
pub const BUILD_SUBCOMMAND: &str = "run";

/// Build tool flag selecting an environment.
pub const ENVIRONMENT_FLAG: &str = "-e";

/// Manifest section prefix declaring an environment (`[env:NAME]`).
pub const ENV_SECTION_PREFIX: &str = "env:";

/// Manifest section holding project-wide options.
pub const PLATFORMIO_SECTION: &str = "platformio";

/// Default workspace directory, relative to the project.
pub const DEFAULT_WORKSPACE_DIR: &str = ".pio";

/// Build directory name inside the workspace directory.
pub const BUILD_DIR_NAME: &str = "build";

/// Presence of this variable (any value) means a constrained CI runner.
pub const CONSTRAINED_CI_ENV: &str = "APPVEYOR";

/// Overrides the PlatformIO core directory.
pub const CORE_DIR_ENV: &str = "PLATFORMIO_CORE_DIR";

/// Default PlatformIO core directory name under the home directory.
pub const DEFAULT_CORE_DIR_NAME: &str = ".platformio";

/// Registry subdirectory holding installed platforms.
pub const PLATFORMS_DIR: &str = "platforms";
