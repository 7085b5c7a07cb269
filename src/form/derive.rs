//! Derived value engine.
//!
//! Rules map a subset of the session to a single output field. They are
//! re-run synchronously whenever one of their triggers changes, in
//! registration order, and a change to a rule's output cascades to the rules
//! it triggers. Registration rejects any rule that would close a cycle, so the
//! cascade always terminates.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::FormError;
use crate::form::field::FieldValue;
use crate::form::registry::FieldRegistry;
use crate::form::session::Session;

/// Computation backing a rule. `Ok(None)` means "not enough input": the
/// output is left untouched rather than cleared.
pub type ComputeFn = dyn Fn(&Session) -> Result<Option<FieldValue>, FormError> + Send + Sync;

#[derive(Clone)]
pub struct DerivedRule {
    output: &'static str,
    triggers: BTreeSet<&'static str>,
    compute: Arc<ComputeFn>,
}

impl DerivedRule {
    pub fn new(
        output: &'static str,
        triggers: impl IntoIterator<Item = &'static str>,
        compute: impl Fn(&Session) -> Result<Option<FieldValue>, FormError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            output,
            triggers: triggers.into_iter().collect(),
            compute: Arc::new(compute),
        }
    }

    pub fn output(&self) -> &'static str {
        self.output
    }

    pub fn triggers(&self) -> &BTreeSet<&'static str> {
        &self.triggers
    }

    pub fn is_triggered_by(&self, field: &str) -> bool {
        self.triggers.contains(field)
    }

    pub fn evaluate(&self, session: &Session) -> Result<Option<FieldValue>, FormError> {
        (self.compute)(session)
    }
}

impl fmt::Debug for DerivedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedRule")
            .field("output", &self.output)
            .field("triggers", &self.triggers)
            .finish()
    }
}

/// What a recomputation pass did to the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecomputeReport {
    /// Outputs whose stored value changed, in the order they were written.
    pub updated: Vec<&'static str>,
    /// Rules that rejected their input; their outputs were left untouched.
    pub failures: Vec<(&'static str, FormError)>,
}

impl RecomputeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: RecomputeReport) {
        self.updated.extend(other.updated);
        self.failures.extend(other.failures);
    }
}

#[derive(Debug, Clone, Default)]
pub struct DerivedValueEngine {
    rules: Vec<DerivedRule>,
}

impl DerivedValueEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule after checking its fields exist and the graph stays acyclic.
    pub fn register_rule(
        &mut self,
        registry: &FieldRegistry,
        rule: DerivedRule,
    ) -> Result<(), FormError> {
        registry.get(rule.output)?;
        for trigger in &rule.triggers {
            registry.get(trigger)?;
        }
        if rule.triggers.contains(rule.output) || self.reaches_any(rule.output, &rule.triggers) {
            return Err(FormError::CyclicRule {
                output: rule.output.to_string(),
            });
        }
        debug!(output = rule.output, triggers = ?rule.triggers, "derived rule registered");
        self.rules.push(rule);
        Ok(())
    }

    pub fn rules(&self) -> &[DerivedRule] {
        &self.rules
    }

    /// Whether the field is written by some rule.
    pub fn is_output(&self, field: &str) -> bool {
        self.rules.iter().any(|rule| rule.output == field)
    }

    /// Whether any target is reachable from `start` through existing rules.
    fn reaches_any(&self, start: &'static str, targets: &BTreeSet<&'static str>) -> bool {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(field) = queue.pop_front() {
            if !seen.insert(field) {
                continue;
            }
            for rule in self.rules.iter().filter(|rule| rule.is_triggered_by(field)) {
                if targets.contains(rule.output) {
                    return true;
                }
                queue.push_back(rule.output);
            }
        }
        false
    }

    /// Re-runs every rule triggered by `field`, cascading through outputs.
    pub fn on_field_changed(&self, session: &mut Session, field: &str) -> RecomputeReport {
        let mut report = RecomputeReport::default();
        let mut queue: VecDeque<String> = VecDeque::from([field.to_string()]);
        while let Some(changed) = queue.pop_front() {
            for rule in self.rules.iter().filter(|rule| rule.is_triggered_by(&changed)) {
                if self.apply(rule, session, &mut report) {
                    queue.push_back(rule.output.to_string());
                }
            }
        }
        report
    }

    /// Runs every rule once in registration order, then cascades changes.
    pub fn recompute_all(&self, session: &mut Session) -> RecomputeReport {
        let mut report = RecomputeReport::default();
        let mut changed = Vec::new();
        for rule in &self.rules {
            if self.apply(rule, session, &mut report) {
                changed.push(rule.output);
            }
        }
        for output in changed {
            let cascade = self.on_field_changed(session, output);
            report.merge(cascade);
        }
        report
    }

    fn apply(&self, rule: &DerivedRule, session: &mut Session, report: &mut RecomputeReport) -> bool {
        match rule.evaluate(session) {
            Ok(Some(value)) => match session.set(rule.output, value) {
                Ok(true) => {
                    report.updated.push(rule.output);
                    true
                }
                Ok(false) => false,
                Err(err) => {
                    report.failures.push((rule.output, err));
                    false
                }
            },
            Ok(None) => false,
            Err(err) => {
                warn!(output = rule.output, error = %err, "derived rule rejected its input");
                report.failures.push((rule.output, err));
                false
            }
        }
    }
}
