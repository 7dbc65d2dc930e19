use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// Empty entries are dropped, so an unset variable yields an empty vector.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `delimiter`: The character to split the environment variable's value by.
///
/// # Returns
/// - `Vec<String>`
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses an environment variable, falling back to `default` when it is unset or malformed.
pub fn get_env_var_or<T: FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn get_env_millis(var: &str, default_millis: u64) -> Duration {
    Duration::from_millis(get_env_var_or(var, default_millis))
}

pub fn get_env_secs(var: &str, default_secs: u64) -> Duration {
    Duration::from_secs(get_env_var_or(var, default_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_as_vec_skips_blanks() {
        env::set_var("NOMENCLATOR_TEST_VEC", "llama3, ,qwen2.5 ,");
        assert_eq!(
            get_env_var_as_vec("NOMENCLATOR_TEST_VEC", ','),
            vec!["llama3".to_string(), "qwen2.5".to_string()]
        );
        assert!(get_env_var_as_vec("NOMENCLATOR_TEST_UNSET_VEC", ',').is_empty());
    }

    #[test]
    fn test_env_var_or_falls_back_on_garbage() {
        env::set_var("NOMENCLATOR_TEST_NUM", "not-a-number");
        assert_eq!(get_env_var_or("NOMENCLATOR_TEST_NUM", 7u32), 7);
        env::set_var("NOMENCLATOR_TEST_NUM_OK", " 12 ");
        assert_eq!(get_env_var_or("NOMENCLATOR_TEST_NUM_OK", 7u32), 12);
        assert_eq!(
            get_env_millis("NOMENCLATOR_TEST_UNSET_MS", 250),
            Duration::from_millis(250)
        );
    }
}
