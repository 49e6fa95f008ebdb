//! Persona catalogs and per-run persona assignment.
//!
//! The built-in office catalog is compiled into the binary. A custom
//! catalog (`{"personas": [...]}`) may replace it, or, in
//! personality-fields-only mode, contribute just the six personality
//! fields by position while the built-in catalog keeps identity and
//! demographics.

use std::collections::BTreeSet;
use std::path::Path;

use evac_types::Persona;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// The built-in office catalog.
const OFFICE_PERSONAS_JSON: &str = include_str!("../../../data/office_personas.json");

/// Errors from loading a persona catalog.
#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    /// The catalog file could not be read.
    #[error("failed to read persona catalog: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog is not valid JSON of the expected shape.
    #[error("failed to parse persona catalog: {0}")]
    Json(#[from] serde_json::Error),

    /// The catalog parsed but lists no personas.
    #[error("persona catalog contains no personas")]
    Empty,
}

/// On-disk catalog shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaCatalog {
    /// Personas in catalog order.
    pub personas: Vec<Persona>,
}

impl PersonaCatalog {
    /// The built-in office catalog.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError`] if the embedded document is broken.
    pub fn office() -> Result<Self, PersonaError> {
        Self::parse(OFFICE_PERSONAS_JSON)
    }

    /// Parse a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError::Json`] for malformed JSON and
    /// [`PersonaError::Empty`] for an empty list.
    pub fn parse(json: &str) -> Result<Self, PersonaError> {
        let catalog: Self = serde_json::from_str(json)?;
        if catalog.personas.is_empty() {
            return Err(PersonaError::Empty);
        }
        Ok(catalog)
    }

    /// Read a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, PersonaError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Resolve the catalog for a run.
    ///
    /// Without a custom path this is the built-in catalog. A custom
    /// catalog that fails to load is logged and replaced by the built-in
    /// one.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError`] only if the built-in catalog is broken.
    pub fn load(custom: Option<&Path>, personality_fields_only: bool) -> Result<Self, PersonaError> {
        let defaults = Self::office()?;
        let Some(path) = custom else {
            return Ok(defaults);
        };
        match Self::from_file(path) {
            Ok(loaded) => {
                info!(
                    path = %path.display(),
                    count = loaded.len(),
                    "loaded custom persona catalog"
                );
                if personality_fields_only {
                    Ok(loaded.merged_onto(&defaults))
                } else {
                    Ok(loaded)
                }
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load persona catalog, using built-in catalog"
                );
                Ok(defaults)
            }
        }
    }

    /// Keep identity from `defaults` and personality from `self`, by
    /// position.
    ///
    /// Entries beyond the shorter list come unchanged from whichever list
    /// is longer.
    #[must_use]
    pub fn merged_onto(&self, defaults: &Self) -> Self {
        let mut personas: Vec<Persona> = self
            .personas
            .iter()
            .enumerate()
            .map(|(i, custom)| match defaults.personas.get(i) {
                Some(base) => {
                    let mut merged = base.clone();
                    merged.adopt_personality(custom);
                    merged
                }
                None => custom.clone(),
            })
            .collect();
        if let Some(rest) = defaults.personas.get(self.personas.len()..) {
            personas.extend_from_slice(rest);
        }
        Self { personas }
    }

    /// Number of personas.
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Persona at `index`.
    pub fn get(&self, index: usize) -> Option<&Persona> {
        self.personas.get(index)
    }
}

/// Hands out personas at random without repeats until the catalog is
/// exhausted, then starts over.
///
/// Display names are unique across the run: a name already handed out gets
/// a numeric suffix (`Maya Ortiz 2`), so person ids and log file names
/// never collide.
#[derive(Debug, Clone, Default)]
pub struct PersonaAssigner {
    assigned: BTreeSet<usize>,
    issued_names: BTreeSet<String>,
}

impl PersonaAssigner {
    /// Create an assigner with nothing handed out.
    pub const fn new() -> Self {
        Self {
            assigned: BTreeSet::new(),
            issued_names: BTreeSet::new(),
        }
    }

    /// Pick the next persona. Returns `None` only for an empty catalog.
    pub fn next_persona<R: Rng + ?Sized>(
        &mut self,
        catalog: &PersonaCatalog,
        rng: &mut R,
    ) -> Option<Persona> {
        if catalog.is_empty() {
            return None;
        }
        if self.assigned.len() >= catalog.len() {
            info!(count = catalog.len(), "all personas assigned, resetting");
            self.assigned.clear();
        }
        let free: Vec<usize> = (0..catalog.len())
            .filter(|i| !self.assigned.contains(i))
            .collect();
        let pick = *free.get(rng.random_range(0..free.len()))?;
        self.assigned.insert(pick);
        let mut persona = catalog.get(pick).cloned()?;
        persona.name = self.unique_name(&persona.name);
        Some(persona)
    }

    /// `name`, or `name N` with the smallest `N >= 2` not yet issued.
    fn unique_name(&mut self, name: &str) -> String {
        let unique = if self.issued_names.contains(name) {
            (2..=usize::MAX)
                .map(|n| format!("{name} {n}"))
                .find(|candidate| !self.issued_names.contains(candidate))
                .unwrap_or_else(|| name.to_owned())
        } else {
            name.to_owned()
        };
        self.issued_names.insert(unique.clone());
        unique
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn persona(name: &str, traits: &str) -> Persona {
        Persona {
            name: name.to_owned(),
            role: "Analyst".to_owned(),
            age: "30".to_owned(),
            gender: "Female".to_owned(),
            pronouns: "she/her".to_owned(),
            personality_traits: traits.to_owned(),
            ..Persona::default()
        }
    }

    #[test]
    fn office_catalog_has_80_unique_names() {
        let Ok(catalog) = PersonaCatalog::office() else {
            panic!("built-in catalog should parse");
        };
        assert_eq!(catalog.len(), 80);
        let names: BTreeSet<&str> = catalog.personas.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.len(), 80);
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(
            PersonaCatalog::parse(r#"{"personas": []}"#),
            Err(PersonaError::Empty)
        ));
        assert!(matches!(
            PersonaCatalog::parse("[]"),
            Err(PersonaError::Json(_))
        ));
    }

    #[test]
    fn merge_keeps_identity_and_takes_personality() {
        let defaults = PersonaCatalog {
            personas: vec![persona("Ann Lee", "calm"), persona("Bo Park", "shy")],
        };
        let custom = PersonaCatalog {
            personas: vec![persona("Someone Else", "bold")],
        };
        let merged = custom.merged_onto(&defaults);
        assert_eq!(merged.len(), 2);
        let first = merged.get(0).cloned().unwrap_or_default();
        assert_eq!(first.name, "Ann Lee");
        assert_eq!(first.personality_traits, "bold");
        let second = merged.get(1).cloned().unwrap_or_default();
        assert_eq!(second.name, "Bo Park");
        assert_eq!(second.personality_traits, "shy");
    }

    #[test]
    fn merge_keeps_extra_custom_entries() {
        let defaults = PersonaCatalog {
            personas: vec![persona("Ann Lee", "calm")],
        };
        let custom = PersonaCatalog {
            personas: vec![persona("X", "bold"), persona("Cy Ode", "loud")],
        };
        let merged = custom.merged_onto(&defaults);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get(1).map(|p| p.name.as_str()), Some("Cy Ode"));
    }

    #[test]
    fn missing_custom_file_falls_back_to_builtin() {
        let path = Path::new("/nonexistent/personas.json");
        let Ok(catalog) = PersonaCatalog::load(Some(path), true) else {
            panic!("fallback should succeed");
        };
        assert_eq!(catalog.len(), 80);
    }

    #[test]
    fn assigner_does_not_repeat_until_exhausted() {
        let catalog = PersonaCatalog {
            personas: vec![persona("A A", ""), persona("B B", ""), persona("C C", "")],
        };
        let mut assigner = PersonaAssigner::new();
        let mut rng = StdRng::seed_from_u64(3);

        let mut first_round = BTreeSet::new();
        for _ in 0..3 {
            let name = assigner
                .next_persona(&catalog, &mut rng)
                .map(|p| p.name)
                .unwrap_or_default();
            first_round.insert(name);
        }
        assert_eq!(first_round.len(), 3);

        // Fourth pick starts a new round instead of failing.
        assert!(assigner.next_persona(&catalog, &mut rng).is_some());
    }

    #[test]
    fn reused_personas_get_unique_names() {
        let catalog = PersonaCatalog {
            personas: vec![persona("Ann Lee", ""), persona("Bo Park", ""), persona("Ann Lee", "")],
        };
        let mut assigner = PersonaAssigner::new();
        let mut rng = StdRng::seed_from_u64(9);

        let names: Vec<String> = (0..7)
            .filter_map(|_| assigner.next_persona(&catalog, &mut rng))
            .map(|p| p.name)
            .collect();
        assert_eq!(names.len(), 7);
        let distinct: BTreeSet<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(distinct.len(), 7);
        let ids: BTreeSet<String> = names.iter().map(|n| evac_types::person_id_for(n)).collect();
        assert_eq!(ids.len(), 7);
        assert!(names.iter().any(|n| n == "Ann Lee 2"));
        assert!(names.iter().any(|n| n == "Bo Park 2"));
    }

    #[test]
    fn office_population_beyond_catalog_keeps_names_unique() {
        let Ok(catalog) = PersonaCatalog::office() else {
            panic!("built-in catalog should parse");
        };
        let mut assigner = PersonaAssigner::new();
        let mut rng = StdRng::seed_from_u64(42);
        let names: BTreeSet<String> = (0..85)
            .filter_map(|_| assigner.next_persona(&catalog, &mut rng))
            .map(|p| p.name)
            .collect();
        assert_eq!(names.len(), 85);
    }

    #[test]
    fn assigner_on_empty_catalog_returns_none() {
        let mut assigner = PersonaAssigner::new();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(assigner.next_persona(&PersonaCatalog::default(), &mut rng).is_none());
    }
}
