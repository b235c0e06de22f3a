//! This module contains the [`SymbolicSimulator`], a [`Dut`] that steps a
//! [`TransitionSystem`] over symbolic terms.
//!
//! Inputs that the testbench does not drive on a given cycle take a fresh
//! free variable named `<input>@<cycle>`, so every cycle of every undriven
//! input is independent of all others.

use std::{
    collections::{BTreeMap, HashMap},
    mem,
};

use tracing::{debug, trace};

use crate::{
    constant::CYCLE_VARIABLE_SEPARATOR,
    dut::{
        system::{check_width, SignalKind, TransitionSystem},
        Dut,
    },
    error::simulation::{Error, Result},
    term::Term,
};

/// A record of one committed cycle of simulation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    /// The cycle that this frame records.
    pub cycle: usize,

    /// The values of the state elements during the cycle.
    pub states: BTreeMap<String, Term>,

    /// The values that drove each input when the cycle was committed.
    pub inputs: BTreeMap<String, Term>,

    /// The explicit input assignments staged for the cycle.
    staged: HashMap<String, Term>,

    /// The number of assumptions that existed before the cycle was committed.
    assumption_count: usize,
}

/// A symbolic simulator for a [`TransitionSystem`].
#[derive(Clone, Debug)]
pub struct SymbolicSimulator {
    /// The design being simulated.
    system: TransitionSystem,

    /// The values of the state elements on the current cycle.
    states: BTreeMap<String, Term>,

    /// Input assignments that take effect on the next advance.
    staged: HashMap<String, Term>,

    /// Input assignments used on every cycle that has no staged assignment.
    defaults: HashMap<String, Term>,

    /// The committed cycles, oldest first.
    history: Vec<Frame>,

    /// The instances of the design's constraints on every committed cycle.
    assumptions: Vec<Term>,

    /// The current cycle.
    cycle: usize,

    /// Whether the state elements have been given initial values.
    initialized: bool,
}

impl SymbolicSimulator {
    /// Constructs a new, uninitialized, simulator for `system`.
    #[must_use]
    pub fn new(system: TransitionSystem) -> Self {
        Self {
            system,
            states: BTreeMap::new(),
            staged: HashMap::new(),
            defaults: HashMap::new(),
            history: Vec::new(),
            assumptions: Vec::new(),
            cycle: 0,
            initialized: false,
        }
    }

    /// Wraps `self` into a [`Box`] for use as a [`crate::dut::DynDut`].
    #[must_use]
    pub fn boxed(self) -> Box<dyn Dut> {
        Box::new(self)
    }

    /// Initializes the state elements.
    ///
    /// Each state element takes its value from `overrides` if present, then
    /// from its declared initial value, and otherwise from a fresh free
    /// variable.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the simulator is already initialized, or if an
    /// override does not name a state element of the right width.
    pub fn set_init<S: Into<String>>(
        &mut self,
        overrides: impl IntoIterator<Item = (S, Term)>,
    ) -> Result<()> {
        self.initialize(overrides, true)
    }

    /// Initializes the state elements, ignoring their declared initial values.
    ///
    /// Every state element not named in `overrides` starts from a fresh free
    /// variable, which makes the run cover every reachable start state.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the simulator is already initialized, or if an
    /// override does not name a state element of the right width.
    pub fn free_init<S: Into<String>>(
        &mut self,
        overrides: impl IntoIterator<Item = (S, Term)>,
    ) -> Result<()> {
        self.initialize(overrides, false)
    }

    /// Gets the design being simulated.
    #[must_use]
    pub fn system(&self) -> &TransitionSystem {
        &self.system
    }

    /// Gets the committed cycles, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Frame] {
        self.history.as_slice()
    }

    /// Logs the value of every state element and input on the current cycle.
    pub fn log_current_frame(&self) {
        for (name, value) in &self.states {
            debug!(cycle = self.cycle, signal = %name, %value, "state");
        }
        for input in self.system.inputs() {
            let value = self.input_value(&input.name, input.width);
            debug!(cycle = self.cycle, signal = %input.name, %value, "input");
        }
    }

    fn initialize<S: Into<String>>(
        &mut self,
        overrides: impl IntoIterator<Item = (S, Term)>,
        use_declared: bool,
    ) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }

        let mut overrides: HashMap<String, Term> = overrides
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        for (name, value) in &overrides {
            let decl = self.system.lookup(name)?;
            if !matches!(decl.kind, SignalKind::State { .. }) {
                return Err(Error::NotAState { name: name.clone() });
            }
            if value.has_signals() {
                return Err(Error::NonConstantInit { name: name.clone() });
            }
            check_width(name, decl.width, value)?;
        }

        let mut states = BTreeMap::new();
        for decl in self.system.states() {
            let declared = match &decl.kind {
                SignalKind::State { init, .. } if use_declared => init.clone(),
                _ => None,
            };
            let value = overrides
                .remove(&decl.name)
                .or(declared)
                .unwrap_or_else(|| Term::var(fresh_name(&decl.name, self.cycle), decl.width));
            trace!(signal = %decl.name, %value, "initial value");
            states.insert(decl.name.clone(), value);
        }

        self.states = states;
        self.initialized = true;
        Ok(())
    }

    /// Gets the value driving the input `name` on the current cycle.
    fn input_value(&self, name: &str, width: u32) -> Term {
        self.staged
            .get(name)
            .or_else(|| self.defaults.get(name))
            .cloned()
            .unwrap_or_else(|| Term::var(fresh_name(name, self.cycle), width))
    }

    /// Checks that `name` is an input that `value` may drive, and instantiates
    /// `value` on the current cycle.
    fn prepare_input(&self, name: &str, value: &Term) -> Result<Term> {
        let decl = self.system.lookup(name)?;
        if !matches!(decl.kind, SignalKind::Input) {
            return Err(Error::NotAnInput { name: name.into() });
        }
        check_width(name, decl.width, value)?;

        if value.has_signals() {
            self.instantiate(value)
        } else {
            Ok(value.clone())
        }
    }
}

impl Dut for SymbolicSimulator {
    fn advance_one_cycle(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        let inputs: BTreeMap<String, Term> = self
            .system
            .inputs()
            .map(|decl| (decl.name.clone(), self.input_value(&decl.name, decl.width)))
            .collect();
        let constraints = self
            .system
            .constraints()
            .iter()
            .map(|constraint| self.instantiate(constraint))
            .collect::<Result<Vec<_>>>()?;

        let mut next_states = BTreeMap::new();
        for decl in self.system.states() {
            let value = match &decl.kind {
                SignalKind::State {
                    next: Some(next), ..
                } => self.instantiate(next)?,
                _ => self.read_signal(&decl.name)?,
            };
            next_states.insert(decl.name.clone(), value);
        }

        let frame = Frame {
            cycle: self.cycle,
            states: mem::replace(&mut self.states, next_states),
            inputs,
            staged: mem::take(&mut self.staged),
            assumption_count: self.assumptions.len(),
        };
        self.history.push(frame);
        self.assumptions.extend(constraints);
        self.cycle += 1;
        debug!(cycle = self.cycle, "advanced the design");

        Ok(())
    }

    /// Restores the state elements and the staged input assignments of the
    /// previous cycle, and drops the assumptions committed with it.
    fn back_step(&mut self) -> Result<()> {
        let frame = self.history.pop().ok_or(Error::NothingToBacktrack)?;
        self.states = frame.states;
        self.staged = frame.staged;
        self.assumptions.truncate(frame.assumption_count);
        self.cycle = frame.cycle;
        debug!(cycle = self.cycle, "stepped the design back");

        Ok(())
    }

    fn read_signal(&self, name: &str) -> Result<Term> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        let decl = self.system.lookup(name)?;
        match &decl.kind {
            SignalKind::Input => Ok(self.input_value(name, decl.width)),
            SignalKind::State { .. } => self
                .states
                .get(name)
                .cloned()
                .ok_or(Error::NotInitialized),
            SignalKind::Wire { definition } => self.instantiate(definition),
        }
    }

    fn write_signal(&mut self, name: &str, value: Term) -> Result<()> {
        let value = self.prepare_input(name, &value)?;
        trace!(cycle = self.cycle, signal = name, %value, "staged input");
        self.staged.insert(name.into(), value);
        Ok(())
    }

    fn unset_signal(&mut self, name: &str) -> Result<()> {
        self.staged
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NoSuchAssignment { name: name.into() })
    }

    fn write_default(&mut self, name: &str, value: Term) -> Result<()> {
        let value = self.prepare_input(name, &value)?;
        self.defaults.insert(name.into(), value);
        Ok(())
    }

    fn unset_default(&mut self, name: &str) -> Result<()> {
        self.defaults
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NoSuchAssignment { name: name.into() })
    }

    fn signal_width(&self, name: &str) -> Result<u32> {
        self.system.lookup(name).map(|decl| decl.width)
    }

    fn cycle(&self) -> usize {
        self.cycle
    }

    /// The constraints of the current cycle are included alongside those of
    /// every committed cycle.
    fn assumptions(&self) -> Vec<Term> {
        let mut assumptions = self.assumptions.clone();
        if self.initialized {
            assumptions.extend(
                self.system
                    .constraints()
                    .iter()
                    .filter_map(|constraint| self.instantiate(constraint).ok()),
            );
        }
        assumptions
    }

    fn properties(&self) -> Vec<Term> {
        self.system.properties().to_vec()
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Names the free variable that stands for `signal` on `cycle`.
fn fresh_name(signal: &str, cycle: usize) -> String {
    format!("{signal}{CYCLE_VARIABLE_SEPARATOR}{cycle}")
}
