// ABOUTME: Static per-framework build profiles
// ABOUTME: Maps framework keys to sandbox image, template paths, cache mounts and build command

use crate::error::ValidationError;
use buildbox_config::defaults::{
    DEFAULT_CACHE_ROOT, DEFAULT_IMAGE_ANGULAR, DEFAULT_IMAGE_REACT, DEFAULT_IMAGE_VUE,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Working directory of the template application inside every image
pub const TEMPLATE_DIR: &str = "/app";

/// Supported component frameworks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Angular,
    React,
    Vue,
}

impl Framework {
    pub const ALL: [Framework; 3] = [Framework::Angular, Framework::React, Framework::Vue];

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Angular => "angular",
            Framework::React => "react",
            Framework::Vue => "vue",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = ValidationError;

    /// Keys match exactly; `" React "` is not a framework.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "angular" => Ok(Framework::Angular),
            "react" => Ok(Framework::React),
            "vue" => Ok(Framework::Vue),
            _ => Err(ValidationError::UnknownFramework(s.to_string())),
        }
    }
}

/// Everything needed to build one framework's template inside a sandbox
#[derive(Debug, Clone, PartialEq)]
pub struct FrameworkProfile {
    pub framework: Framework,
    pub image: String,
    pub work_dir: &'static str,
    /// Absolute path the normalized source is written to
    pub source_path: &'static str,
    /// Template files, relative to `work_dir`, that would shadow the submitted source
    pub conflicting_files: &'static [&'static str],
    pub output_dir: &'static str,
    pub host_cache_dir: PathBuf,
    pub sandbox_cache_dir: &'static str,
    pub build_command: &'static str,
}

/// Overridable inputs for the profile table
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSettings {
    pub cache_root: PathBuf,
    pub angular_image: String,
    pub react_image: String,
    pub vue_image: String,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            angular_image: DEFAULT_IMAGE_ANGULAR.to_string(),
            react_image: DEFAULT_IMAGE_REACT.to_string(),
            vue_image: DEFAULT_IMAGE_VUE.to_string(),
        }
    }
}

/// Exactly one profile per framework
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    angular: FrameworkProfile,
    react: FrameworkProfile,
    vue: FrameworkProfile,
}

impl ProfileRegistry {
    pub fn new(settings: &ProfileSettings) -> Self {
        Self {
            angular: FrameworkProfile {
                framework: Framework::Angular,
                image: settings.angular_image.clone(),
                work_dir: TEMPLATE_DIR,
                source_path: "/app/src/app/app.component.ts",
                conflicting_files: &[
                    "src/app/app.component.html",
                    "src/app/app.component.css",
                    "src/app/app.component.scss",
                ],
                output_dir: "/app/dist",
                host_cache_dir: settings.cache_root.join("angular"),
                sandbox_cache_dir: "/app/.angular/cache",
                build_command: "npx ng build --configuration production --output-hashing none",
            },
            react: FrameworkProfile {
                framework: Framework::React,
                image: settings.react_image.clone(),
                work_dir: TEMPLATE_DIR,
                source_path: "/app/src/App.jsx",
                conflicting_files: &["src/App.js", "src/App.tsx", "src/App.ts"],
                output_dir: "/app/dist",
                host_cache_dir: settings.cache_root.join("react"),
                sandbox_cache_dir: "/app/node_modules/.vite",
                build_command: "npm run build",
            },
            vue: FrameworkProfile {
                framework: Framework::Vue,
                image: settings.vue_image.clone(),
                work_dir: TEMPLATE_DIR,
                source_path: "/app/src/App.vue",
                conflicting_files: &[],
                output_dir: "/app/dist",
                host_cache_dir: settings.cache_root.join("vue"),
                sandbox_cache_dir: "/app/node_modules/.vite",
                build_command: "npm run build",
            },
        }
    }

    pub fn get(&self, framework: Framework) -> &FrameworkProfile {
        match framework {
            Framework::Angular => &self.angular,
            Framework::React => &self.react,
            Framework::Vue => &self.vue,
        }
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new(&ProfileSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("angular", Framework::Angular)]
    #[case("react", Framework::React)]
    #[case("vue", Framework::Vue)]
    fn test_parse_known_frameworks(#[case] input: &str, #[case] expected: Framework) {
        assert_eq!(input.parse::<Framework>().unwrap(), expected);
    }

    #[rstest]
    #[case("svelte")]
    #[case("")]
    #[case("angularjs")]
    #[case("React")]
    #[case(" vue ")]
    fn test_parse_unknown_framework(#[case] input: &str) {
        let err = input.parse::<Framework>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownFramework(input.to_string()));
    }

    #[test]
    fn test_one_profile_per_framework() {
        let registry = ProfileRegistry::default();
        for framework in Framework::ALL {
            assert_eq!(registry.get(framework).framework, framework);
        }
    }

    #[test]
    fn test_cache_dirs_follow_cache_root() {
        let settings = ProfileSettings {
            cache_root: PathBuf::from("/tmp/cache"),
            ..Default::default()
        };
        let registry = ProfileRegistry::new(&settings);
        assert_eq!(
            registry.get(Framework::Vue).host_cache_dir,
            PathBuf::from("/tmp/cache/vue")
        );
        assert_eq!(registry.get(Framework::React).image, DEFAULT_IMAGE_REACT);
    }
}
