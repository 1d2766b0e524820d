//! The functions
//!
use std::{collections::BTreeMap, env, fs, io::Write, path::Path};
use log::*;
use anyhow::{Context, Result};

pub const ENV_KUBE_CONTEXT: &str = "YBREPORT_KUBE_CONTEXT";
pub const ENV_NAMESPACE: &str = "YBREPORT_NAMESPACE";
pub const ENV_RELEASE_NAME: &str = "YBREPORT_RELEASE_NAME";
pub const ENV_PROMETHEUS_URL: &str = "YBREPORT_PROMETHEUS_URL";
pub const ENV_TEMPLATE: &str = "YBREPORT_TEMPLATE";

/// Resolve a setting: the command line option if set,
/// otherwise the environment variable (which can be set via `.env`), otherwise the default.
///
/// A setting that is not the default is recorded in `changed_options`, so it can be written to `.env`.
pub fn set_option(
    option: &Option<String>,
    env_key: &'static str,
    default: &str,
    changed_options: &mut BTreeMap<&'static str, String>,
) -> String
{
    match option {
        Some(value) => {
            info!("{} argument set: using: {}", env_key, value);
            changed_options.insert(env_key, value.clone());
            value.clone()
        },
        None => match env::var(env_key) {
            Ok(value) => {
                info!("{} not set as argument: set via .env: {}", env_key, value);
                changed_options.insert(env_key, value.clone());
                value
            },
            Err(_e) => {
                info!("{} not set as argument and not set via .env: using default: {}", env_key, default);
                default.to_string()
            },
        },
    }
}

/// Write the changed options to `dotenv_file` when asked for, so the next run picks them up.
/// The file is overwritten.
pub fn dotenv_writer(
    write_dotenv: bool,
    dotenv_file: &Path,
    changed_options: &BTreeMap<&'static str, String>,
) -> Result<()>
{
    if !changed_options.is_empty() && write_dotenv {
        info!("Writing {}", dotenv_file.display());
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(dotenv_file)
            .with_context(|| format!("Error writing .env file: {}", dotenv_file.display()))?;

        for (key, value) in changed_options {
            file.write_all(format!("{}={}\n", key, value).as_bytes())?;
            info!("{}={}", key, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_set_option_argument_wins() {
        let mut changed_options = BTreeMap::new();
        let value = set_option(&Some("kind-yb".to_string()), ENV_KUBE_CONTEXT, "minikube", &mut changed_options);
        assert_eq!(value, "kind-yb");
        assert_eq!(changed_options.get(ENV_KUBE_CONTEXT).map(|v| v.as_str()), Some("kind-yb"));
    }

    #[test]
    fn unit_set_option_environment_then_default() {
        // a key no other test touches, as tests run in parallel in one process.
        const KEY: &str = "YBREPORT_UNIT_TEST_SETTING";
        let mut changed_options = BTreeMap::new();
        env::remove_var(KEY);
        assert_eq!(set_option(&None, KEY, "default-value", &mut changed_options), "default-value");
        assert!(changed_options.is_empty());

        env::set_var(KEY, "from-env");
        assert_eq!(set_option(&None, KEY, "default-value", &mut changed_options), "from-env");
        assert_eq!(changed_options.get(KEY).map(|v| v.as_str()), Some("from-env"));
        env::remove_var(KEY);
    }

    #[test]
    fn unit_dotenv_writer() {
        let directory = tempfile::tempdir().unwrap();
        let dotenv_file = directory.path().join(".env");
        let changed_options = BTreeMap::from([(ENV_NAMESPACE, "bench".to_string()), (ENV_KUBE_CONTEXT, "kind-yb".to_string())]);

        dotenv_writer(false, &dotenv_file, &changed_options).unwrap();
        assert!(!dotenv_file.exists());

        dotenv_writer(true, &dotenv_file, &changed_options).unwrap();
        assert_eq!(fs::read_to_string(&dotenv_file).unwrap(), "YBREPORT_KUBE_CONTEXT=kind-yb\nYBREPORT_NAMESPACE=bench\n");
    }
}
