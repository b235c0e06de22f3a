//! This module contains the [`TransitionSystem`], an in-memory description of
//! a clocked design in terms of its inputs, state elements, and combinational
//! wires.

use std::collections::HashMap;

use crate::{
    constant::MAXIMUM_BIT_WIDTH,
    error::simulation::{Error, Result},
    term::Term,
};

/// The role that a signal plays in the design.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignalKind {
    /// A primary input, driven by the testbench on every cycle.
    Input,

    /// A state element.
    ///
    /// The `init` term gives its value on the first cycle when the design is
    /// initialized with declared values, and the `next` term gives its value on
    /// the following cycle. A state element without a `next` term holds its
    /// value.
    State { init: Option<Term>, next: Option<Term> },

    /// A combinational signal computed from other signals on the same cycle.
    Wire { definition: Term },
}

/// The declaration of a single signal in the design.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignalDecl {
    pub name:  String,
    pub width: u32,
    pub kind:  SignalKind,
}

/// A description of a clocked design.
///
/// Definitions are written as [`Term`]s over [`Term::Signal`] references,
/// which the `add_*` methods return for convenience. Wires may only reference
/// signals that were declared before them, which keeps the combinational logic
/// acyclic.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransitionSystem {
    /// The signals in declaration order.
    signals: Vec<SignalDecl>,

    /// The position of each signal in `signals`, by name.
    index: HashMap<String, usize>,

    /// Conditions that the design assumes hold on every cycle.
    constraints: Vec<Term>,

    /// Conditions that the design is expected to uphold on every cycle.
    properties: Vec<Term>,
}

impl TransitionSystem {
    /// Constructs a new, empty, transition system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a primary input of the given `width`, returning a reference to
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the name is taken or the width is not representable.
    pub fn add_input(&mut self, name: impl Into<String>, width: u32) -> Result<Term> {
        self.declare(name.into(), width, SignalKind::Input)
    }

    /// Declares a state element of the given `width` with no initial or next
    /// value, returning a reference to it.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the name is taken or the width is not representable.
    pub fn add_state(&mut self, name: impl Into<String>, width: u32) -> Result<Term> {
        self.declare(name.into(), width, SignalKind::State {
            init: None,
            next: None,
        })
    }

    /// Declares a combinational wire named `name` computed by `definition`,
    /// returning a reference to it.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the name is taken, or if `definition` references a
    /// signal that has not been declared.
    pub fn add_wire(&mut self, name: impl Into<String>, definition: Term) -> Result<Term> {
        self.check_references(&definition)?;
        let width = definition.width();
        self.declare(name.into(), width, SignalKind::Wire { definition })
    }

    /// Sets the initial value of the state element `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` is not a state element, or if `value` has the
    /// wrong width or references signals.
    pub fn set_init(&mut self, name: &str, value: Term) -> Result<()> {
        if value.has_signals() {
            return Err(Error::NonConstantInit { name: name.into() });
        }
        let (width, kind) = self.state_mut(name)?;
        check_width(name, width, &value)?;
        if let SignalKind::State { init, .. } = kind {
            *init = Some(value);
        }
        Ok(())
    }

    /// Sets the value that the state element `name` takes on the next cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` is not a state element, or if `value` has the
    /// wrong width or references undeclared signals.
    pub fn set_next(&mut self, name: &str, value: Term) -> Result<()> {
        self.check_references(&value)?;
        let (width, kind) = self.state_mut(name)?;
        check_width(name, width, &value)?;
        if let SignalKind::State { next, .. } = kind {
            *next = Some(value);
        }
        Ok(())
    }

    /// Adds a condition that the design assumes on every cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `constraint` references undeclared signals.
    pub fn add_constraint(&mut self, constraint: Term) -> Result<()> {
        self.check_references(&constraint)?;
        self.constraints.push(constraint);
        Ok(())
    }

    /// Adds a condition that the design is expected to uphold on every cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `property` references undeclared signals.
    pub fn add_property(&mut self, property: Term) -> Result<()> {
        self.check_references(&property)?;
        self.properties.push(property);
        Ok(())
    }

    /// Gets the declaration of the signal `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no such signal.
    pub fn lookup(&self, name: &str) -> Result<&SignalDecl> {
        self.index
            .get(name)
            .and_then(|ix| self.signals.get(*ix))
            .ok_or_else(|| Error::NoSuchSignal { name: name.into() })
    }

    /// Checks if `name` is a primary input.
    #[must_use]
    pub fn is_input(&self, name: &str) -> bool {
        matches!(
            self.lookup(name),
            Ok(SignalDecl {
                kind: SignalKind::Input,
                ..
            })
        )
    }

    /// Gets all of the signals in declaration order.
    #[must_use]
    pub fn signals(&self) -> &[SignalDecl] {
        self.signals.as_slice()
    }

    /// Gets the primary inputs in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &SignalDecl> {
        self.signals
            .iter()
            .filter(|s| matches!(s.kind, SignalKind::Input))
    }

    /// Gets the state elements in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &SignalDecl> {
        self.signals
            .iter()
            .filter(|s| matches!(s.kind, SignalKind::State { .. }))
    }

    /// Gets the design's constraints.
    #[must_use]
    pub fn constraints(&self) -> &[Term] {
        self.constraints.as_slice()
    }

    /// Gets the design's properties.
    #[must_use]
    pub fn properties(&self) -> &[Term] {
        self.properties.as_slice()
    }

    /// Checks whether the design has no state elements, and hence is purely
    /// combinational.
    #[must_use]
    pub fn is_combinational(&self) -> bool {
        self.states().next().is_none()
    }

    fn declare(&mut self, name: String, width: u32, kind: SignalKind) -> Result<Term> {
        if width == 0 || width > MAXIMUM_BIT_WIDTH {
            return Err(Error::InvalidWidth { width });
        }
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateSignal { name });
        }

        self.index.insert(name.clone(), self.signals.len());
        self.signals.push(SignalDecl {
            name: name.clone(),
            width,
            kind,
        });

        Ok(Term::signal(name, width))
    }

    fn state_mut(&mut self, name: &str) -> Result<(u32, &mut SignalKind)> {
        let ix = *self
            .index
            .get(name)
            .ok_or_else(|| Error::NoSuchSignal { name: name.into() })?;
        match self.signals.get_mut(ix) {
            Some(SignalDecl {
                width,
                kind: kind @ SignalKind::State { .. },
                ..
            }) => Ok((*width, kind)),
            _ => Err(Error::NotAState { name: name.into() }),
        }
    }

    /// Checks that every signal referenced by `term` has been declared with the
    /// width it is referenced at.
    fn check_references(&self, term: &Term) -> Result<()> {
        let mut result = Ok(());
        term.visit(&mut |node| {
            if result.is_err() {
                return;
            }
            if let Term::Signal { name, width } = node {
                result = self.lookup(name).and_then(|decl| {
                    if decl.width == *width {
                        Ok(())
                    } else {
                        Err(Error::WidthMismatch {
                            name:     name.clone(),
                            expected: decl.width,
                            actual:   *width,
                        })
                    }
                });
            }
        });
        result
    }
}

/// Checks that `value` is exactly as wide as the signal `name`.
pub(crate) fn check_width(name: &str, width: u32, value: &Term) -> Result<()> {
    let actual = value.width();
    if actual == width {
        Ok(())
    } else {
        Err(Error::WidthMismatch {
            name: name.into(),
            expected: width,
            actual,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::{
        dut::system::{SignalKind, TransitionSystem},
        error::simulation::Error,
        term::Term,
    };

    #[test]
    fn declares_signals_in_order() -> anyhow::Result<()> {
        let mut system = TransitionSystem::new();
        let a = system.add_input("a", 8)?;
        let count = system.add_state("count", 8)?;
        system.add_wire("sum", a + count)?;

        let names: Vec<&str> = system.signals().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "count", "sum"]);
        assert_eq!(system.inputs().count(), 1);
        assert_eq!(system.states().count(), 1);
        assert!(system.is_input("a"));
        assert!(!system.is_input("sum"));
        assert_eq!(system.lookup("sum")?.width, 8);
        assert!(!system.is_combinational());

        Ok(())
    }

    #[test]
    fn sets_init_and_next_of_states() -> anyhow::Result<()> {
        let mut system = TransitionSystem::new();
        let count = system.add_state("count", 4)?;
        system.set_init("count", Term::constant(0, 4))?;
        system.set_next("count", count + Term::constant(1, 4))?;

        match &system.lookup("count")?.kind {
            SignalKind::State { init, next } => {
                assert_eq!(init, &Some(Term::constant(0, 4)));
                assert!(next.is_some());
            }
            kind => panic!("Expected a state but found {kind:?}"),
        }

        Ok(())
    }

    #[test]
    fn rejects_duplicate_and_invalid_declarations() -> anyhow::Result<()> {
        let mut system = TransitionSystem::new();
        system.add_input("a", 1)?;

        assert_eq!(
            system.add_input("a", 1),
            Err(Error::DuplicateSignal { name: "a".into() })
        );
        assert_eq!(
            system.add_state("zero", 0),
            Err(Error::InvalidWidth { width: 0 })
        );

        Ok(())
    }

    #[test]
    fn rejects_references_to_undeclared_signals() {
        let mut system = TransitionSystem::new();
        let result = system.add_wire("w", Term::signal("ghost", 1));

        assert_eq!(
            result,
            Err(Error::NoSuchSignal {
                name: "ghost".into(),
            })
        );
    }

    #[test]
    fn rejects_badly_sized_next_values() -> anyhow::Result<()> {
        let mut system = TransitionSystem::new();
        system.add_state("r", 4)?;

        assert_eq!(
            system.set_next("r", Term::constant(1, 8)),
            Err(Error::WidthMismatch {
                name:     "r".into(),
                expected: 4,
                actual:   8,
            })
        );
        assert_eq!(
            system.set_init("missing", Term::constant(1, 8)),
            Err(Error::NoSuchSignal {
                name: "missing".into(),
            })
        );

        Ok(())
    }

    #[test]
    fn init_values_cannot_reference_signals() -> anyhow::Result<()> {
        let mut system = TransitionSystem::new();
        let a = system.add_input("a", 2)?;
        system.add_state("r", 2)?;

        assert_eq!(
            system.set_init("r", a),
            Err(Error::NonConstantInit { name: "r".into() })
        );

        Ok(())
    }

    #[test]
    fn only_state_elements_take_init_values() -> anyhow::Result<()> {
        let mut system = TransitionSystem::new();
        system.add_input("in", 2)?;

        assert_eq!(
            system.set_init("in", Term::constant(1, 2)),
            Err(Error::NotAState { name: "in".into() })
        );

        Ok(())
    }
}
