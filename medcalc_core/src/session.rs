//! Session composition: one profile store, many mounted calculators.

use crate::calculators::{get_calculator, CalculatorDef, InputError, Outcome};
use crate::profile::DEFAULT_HISTORY_LIMIT;
use crate::{Config, EqualityMode, Error, FieldSync, ProfileStore, Result};
use uuid::Uuid;

/// A calculator on screen, with its own form state
#[derive(Debug)]
pub struct MountedCalculator {
    pub instance: Uuid,
    pub def: &'static CalculatorDef,
    pub sync: FieldSync,
}

impl MountedCalculator {
    /// Run the calculator's formula over its current form state
    pub fn evaluate(&self) -> std::result::Result<Outcome, InputError> {
        self.def.evaluate(self.sync.values())
    }
}

/// The application session: the shared profile and the mounted calculators
#[derive(Debug)]
pub struct Session {
    store: ProfileStore,
    equality: EqualityMode,
    mounted: Vec<MountedCalculator>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EqualityMode::default(), DEFAULT_HISTORY_LIMIT)
    }
}

impl Session {
    pub fn new(equality: EqualityMode, history_limit: usize) -> Self {
        Self {
            store: ProfileStore::with_history_limit(history_limit),
            equality,
            mounted: Vec::new(),
        }
    }

    /// Build a session and mount the calculators listed in the config
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut session = Self::new(config.suggestions.equality, config.profile.history_limit);
        for id in &config.session.open {
            session.mount(id)?;
        }
        Ok(session)
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Mount a fresh instance of a calculator; its form starts blank
    pub fn mount(&mut self, id: &str) -> Result<Uuid> {
        let def = get_calculator(id).ok_or_else(|| Error::UnknownCalculator(id.to_string()))?;
        let instance = Uuid::new_v4();
        let sync = FieldSync::with_equality(&self.store, def.template(), self.equality);
        self.mounted.push(MountedCalculator {
            instance,
            def,
            sync,
        });
        tracing::info!(calculator = def.id, %instance, "Mounted calculator");
        Ok(instance)
    }

    /// Unmount an instance; its local state is discarded, the profile kept
    pub fn unmount(&mut self, instance: Uuid) -> Result<()> {
        let position = self
            .position(instance)
            .ok_or_else(|| Error::UnknownInstance(instance.to_string()))?;
        let removed = self.mounted.remove(position);
        tracing::info!(calculator = removed.def.id, %instance, "Unmounted calculator");
        Ok(())
    }

    pub fn get(&self, instance: Uuid) -> Option<&MountedCalculator> {
        self.mounted.iter().find(|m| m.instance == instance)
    }

    pub fn get_mut(&mut self, instance: Uuid) -> Option<&mut MountedCalculator> {
        self.mounted.iter_mut().find(|m| m.instance == instance)
    }

    /// Instance at a zero-based screen position
    pub fn instance_at(&self, index: usize) -> Option<Uuid> {
        self.mounted.get(index).map(|m| m.instance)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountedCalculator> {
        self.mounted.iter()
    }

    pub fn len(&self) -> usize {
        self.mounted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }

    /// Clear the shared profile; local forms are untouched
    pub fn clear_profile(&self) {
        self.store.reset();
        tracing::info!("Patient profile cleared");
    }

    /// Instances told about a profile change since they were last asked
    pub fn take_changed(&self) -> Vec<Uuid> {
        self.mounted
            .iter()
            .filter(|m| m.sync.take_profile_changed())
            .map(|m| m.instance)
            .collect()
    }

    fn position(&self, instance: Uuid) -> Option<usize> {
        self.mounted.iter().position(|m| m.instance == instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldValue, SharedField};

    #[test]
    fn test_mount_unknown_calculator() {
        let mut session = Session::default();
        let err = session.mount("apgar").unwrap_err();
        assert!(matches!(err, Error::UnknownCalculator(ref id) if id == "apgar"));
    }

    #[test]
    fn test_same_calculator_twice() {
        let mut session = Session::default();
        let first = session.mount("bmi").unwrap();
        let second = session.mount("bmi").unwrap();
        assert_ne!(first, second);
        assert_eq!(session.len(), 2);
        assert_eq!(session.store().subscriber_count(), 2);
    }

    #[test]
    fn test_unmount_drops_subscription_keeps_profile() {
        let mut session = Session::default();
        let bmi = session.mount("bmi").unwrap();
        session
            .get_mut(bmi)
            .unwrap()
            .sync
            .update_field("weight", "70");

        session.unmount(bmi).unwrap();
        assert!(session.is_empty());
        assert_eq!(session.store().subscriber_count(), 0);
        assert_eq!(
            session.store().get().get(SharedField::Weight),
            &FieldValue::from("70")
        );
        assert!(session.unmount(bmi).is_err());
    }

    #[test]
    fn test_evaluate_mounted() {
        let mut session = Session::default();
        let map = session.mount("map").unwrap();
        let calc = session.get_mut(map).unwrap();
        calc.sync.update_fields([("sbp", "120"), ("dbp", "75")]);
        assert_eq!(calc.evaluate().unwrap().value, 90.0);
    }

    #[test]
    fn test_take_changed_reports_every_instance() {
        let mut session = Session::default();
        let bmi = session.mount("bmi").unwrap();
        let fluids = session.mount("maintenance_fluids").unwrap();
        assert!(session.take_changed().is_empty());

        session.get_mut(bmi).unwrap().sync.update_field("weight", "70");
        let changed = session.take_changed();
        assert_eq!(changed, vec![bmi, fluids]);
        assert!(session.take_changed().is_empty());
    }

    #[test]
    fn test_from_config_mounts_listed_calculators() {
        let mut config = Config::default();
        config.session.open = vec!["bmi".into(), "egfr".into()];
        config.suggestions.equality = EqualityMode::Numeric;

        let session = Session::from_config(&config).unwrap();
        let ids: Vec<_> = session.iter().map(|m| m.def.id).collect();
        assert_eq!(ids, vec!["bmi", "egfr"]);
        assert_eq!(
            session.get(session.instance_at(0).unwrap()).unwrap().sync.equality(),
            EqualityMode::Numeric
        );
    }
}
