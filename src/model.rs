/// The models offered by the picker. Anything else has to be installed and
/// selected outside this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Model {
    #[default]
    Llama2,
    Codellama,
    Mistral,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Llama2 => "llama2",
            Model::Codellama => "codellama",
            Model::Mistral => "mistral",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "llama2" => Some(Model::Llama2),
            "codellama" => Some(Model::Codellama),
            "mistral" => Some(Model::Mistral),
            _ => None,
        }
    }

    pub fn all() -> Vec<Model> {
        vec![Model::Llama2, Model::Codellama, Model::Mistral]
    }

    /// Position in the picker list
    pub fn index(&self) -> usize {
        Self::all().iter().position(|m| m == self).unwrap_or(0)
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value parser for `--model`, so clap rejects names outside the picker set.
pub fn parse_model(s: &str) -> Result<Model, String> {
    Model::from_str(s).ok_or_else(|| {
        let names: Vec<&str> = Model::all().iter().map(|m| m.as_str()).collect();
        format!("unknown model '{}', expected one of: {}", s, names.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_accepts_picker_names() {
        for model in Model::all() {
            assert_eq!(Model::from_str(model.as_str()), Some(model));
        }
        assert_eq!(Model::from_str(" Mistral "), Some(Model::Mistral));
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert_eq!(Model::from_str("gpt-4"), None);
        assert!(parse_model("llama3").is_err());
    }

    #[test]
    fn test_default_is_llama2() {
        assert_eq!(Model::default(), Model::Llama2);
        assert_eq!(Model::default().index(), 0);
        assert_eq!(Model::Mistral.index(), 2);
    }
}
