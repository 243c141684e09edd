//! Capability descriptions.
//!
//! A [`Description`] says how to monitor one capability surface: which
//! [`EqualityPolicy`] decides equality for its instances, and which
//! operations return *dependent* objects (iterators, views) that must be
//! monitored as well, together with the description to monitor them with.
//!
//! Descriptions are assembled with a [`DescriptionBuilder`] and frozen into
//! an `Arc<Description<_>>`; there is no way to alter one after it has been
//! used to wrap an instance.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use sharewatch_error::{Result, UsageError};
use sharewatch_types::Operation;

use crate::capability::Capability;
use crate::equality::{EqualityPolicy, ReferenceIdentity};

/// Where the result of a dependent operation gets its description from.
#[derive(Clone)]
enum Dependent {
    /// The operation returns the described surface itself (e.g. a sub-list).
    Itself,
    Child(Arc<dyn ErasedDescription>),
}

/// Object-safe view of a description of any capability.
trait ErasedDescription: Send + Sync + 'static {
    fn capability(&self) -> &'static str;
    fn surface_type(&self) -> &'static str;
    fn policy_name(&self) -> &'static str;
    fn dependents(&self) -> &BTreeMap<Operation, Dependent>;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// How to monitor capability surface `C`.
pub struct Description<C: ?Sized + Capability> {
    policy: Arc<dyn EqualityPolicy<C>>,
    dependents: BTreeMap<Operation, Dependent>,
}

impl<C: ?Sized + Capability> Description<C> {
    /// Start describing `C` with the reference-identity policy and no
    /// dependents.
    #[must_use]
    pub fn builder() -> DescriptionBuilder<C> {
        DescriptionBuilder {
            policy: Arc::new(ReferenceIdentity),
            dependents: BTreeMap::new(),
        }
    }

    /// A description with the reference-identity policy and no dependents.
    #[must_use]
    pub fn plain() -> Arc<Self> {
        Self::builder().build()
    }

    /// Capability-surface identifier.
    #[must_use]
    pub fn capability(&self) -> &'static str {
        C::NAME
    }

    /// The equality policy for instances of `C`.
    #[must_use]
    pub fn equality_policy(&self) -> &dyn EqualityPolicy<C> {
        &*self.policy
    }

    /// Capability of the description registered for `operation`, if any.
    #[must_use]
    pub fn dependent_capability(&self, operation: &Operation) -> Option<&'static str> {
        self.dependents.get(operation).map(|dependent| match dependent {
            Dependent::Itself => C::NAME,
            Dependent::Child(child) => child.capability(),
        })
    }

    /// Operations whose results are monitored, in operation order.
    pub fn dependent_operations(&self) -> impl Iterator<Item = &Operation> {
        self.dependents.keys()
    }

    /// Resolve the description registered for `operation` as a description
    /// of surface `D`.
    ///
    /// Returns `None` when nothing is registered, or when the registered
    /// description does not describe `D` (logged, since registration
    /// validation makes that a mismatch between two surfaces sharing a name).
    #[must_use]
    pub fn dependent_for<D: ?Sized + Capability>(
        this: &Arc<Self>,
        operation: &Operation,
    ) -> Option<Arc<Description<D>>> {
        let erased: Arc<dyn Any + Send + Sync> = match this.dependents.get(operation)? {
            Dependent::Itself => Arc::clone(this) as Arc<dyn Any + Send + Sync>,
            Dependent::Child(child) => Arc::clone(child).into_any(),
        };
        match erased.downcast::<Description<D>>() {
            Ok(description) => Some(description),
            Err(_) => {
                tracing::error!(
                    operation = %operation,
                    expected = std::any::type_name::<D>(),
                    "sharewatch::dependent_type_mismatch"
                );
                None
            }
        }
    }
}

impl<C: ?Sized + Capability> ErasedDescription for Description<C> {
    fn capability(&self) -> &'static str {
        C::NAME
    }

    fn surface_type(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    fn dependents(&self) -> &BTreeMap<Operation, Dependent> {
        &self.dependents
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

fn same_structure(a: &dyn ErasedDescription, b: &dyn ErasedDescription) -> bool {
    a.surface_type() == b.surface_type()
        && a.policy_name() == b.policy_name()
        && a.dependents().len() == b.dependents().len()
        && a
            .dependents()
            .iter()
            .zip(b.dependents())
            .all(|((op_a, dep_a), (op_b, dep_b))| op_a == op_b && same_dependent(dep_a, dep_b))
}

fn same_dependent(a: &Dependent, b: &Dependent) -> bool {
    match (a, b) {
        (Dependent::Itself, Dependent::Itself) => true,
        (Dependent::Child(a), Dependent::Child(b)) => {
            std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)) || same_structure(&**a, &**b)
        }
        _ => false,
    }
}

impl<C: ?Sized + Capability> PartialEq for Description<C> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || same_structure(self, other)
    }
}

impl<C: ?Sized + Capability> Eq for Description<C> {}

impl<C: ?Sized + Capability> Hash for Description<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::any::type_name::<C>().hash(state);
    }
}

impl<C: ?Sized + Capability> fmt::Debug for Description<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dependents: BTreeMap<String, &'static str> = self
            .dependents
            .iter()
            .map(|(operation, dependent)| {
                let target = match dependent {
                    Dependent::Itself => "<self>",
                    Dependent::Child(child) => child.capability(),
                };
                (operation.to_string(), target)
            })
            .collect();
        f.debug_struct("Description")
            .field("capability", &C::NAME)
            .field("policy", &self.policy.name())
            .field("dependents", &dependents)
            .finish()
    }
}

/// Assembles a [`Description`].
///
/// Registering the same operation twice keeps the last registration.
pub struct DescriptionBuilder<C: ?Sized + Capability> {
    policy: Arc<dyn EqualityPolicy<C>>,
    dependents: BTreeMap<Operation, Dependent>,
}

impl<C: ?Sized + Capability> DescriptionBuilder<C> {
    /// Replace the equality policy.
    #[must_use]
    pub fn equality(mut self, policy: impl EqualityPolicy<C>) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Replace the equality policy with an already shared one.
    #[must_use]
    pub fn shared_equality(mut self, policy: Arc<dyn EqualityPolicy<C>>) -> Self {
        self.policy = policy;
        self
    }

    /// Declare that results of `operation` are monitored with `child`.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError`] if `operation` is not declared by `C`, does not
    /// return a capability instance, or returns a capability other than the
    /// one `child` describes.
    pub fn register_dependent<D: ?Sized + Capability>(
        mut self,
        operation: Operation,
        child: Arc<Description<D>>,
    ) -> Result<Self> {
        check_dependent::<C>(&operation, D::NAME)?;
        self.dependents
            .insert(operation, Dependent::Child(child as Arc<dyn ErasedDescription>));
        Ok(self)
    }

    /// Declare that results of `operation` are monitored with the
    /// description being built.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError`] under the same conditions as
    /// [`register_dependent`](Self::register_dependent).
    pub fn register_self_dependent(mut self, operation: Operation) -> Result<Self> {
        check_dependent::<C>(&operation, C::NAME)?;
        self.dependents.insert(operation, Dependent::Itself);
        Ok(self)
    }

    /// Freeze the description.
    #[must_use]
    pub fn build(self) -> Arc<Description<C>> {
        Arc::new(Description {
            policy: self.policy,
            dependents: self.dependents,
        })
    }
}

fn check_dependent<C: ?Sized + Capability>(
    operation: &Operation,
    child_capability: &'static str,
) -> Result<()> {
    if !C::declares(operation) {
        return Err(UsageError::UnknownOperation {
            capability: C::NAME,
            operation: operation.to_string(),
        });
    }
    match operation.returns() {
        None => Err(UsageError::NotDependent {
            operation: operation.to_string(),
        }),
        Some(expected) if expected != child_capability => Err(UsageError::IncompatibleDependent {
            operation: operation.to_string(),
            expected,
            actual: child_capability,
        }),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equality::FnPolicy;
    use crate::testkit::{Gauge, Reading, gauge_ops, reading_ops};

    fn readings() -> Arc<Description<dyn Reading>> {
        Description::<dyn Reading>::plain()
    }

    #[test]
    fn plain_description_uses_identity_and_has_no_dependents() {
        let desc = Description::<dyn Gauge>::plain();
        assert_eq!(desc.capability(), "Gauge");
        assert_eq!(desc.equality_policy().name(), "reference-identity");
        assert_eq!(desc.dependent_operations().count(), 0);
        assert!(Description::dependent_for::<dyn Reading>(&desc, &gauge_ops::SNAPSHOT).is_none());
    }

    #[test]
    fn registered_dependent_resolves_to_child() {
        let child = readings();
        let desc = Description::<dyn Gauge>::builder()
            .register_dependent(gauge_ops::SNAPSHOT, Arc::clone(&child))
            .unwrap()
            .build();
        let resolved = Description::dependent_for::<dyn Reading>(&desc, &gauge_ops::SNAPSHOT)
            .expect("snapshot is registered");
        assert!(Arc::ptr_eq(&resolved, &child));
        assert_eq!(desc.dependent_capability(&gauge_ops::SNAPSHOT), Some("Reading"));
    }

    #[test]
    fn self_dependent_resolves_to_same_description() {
        let desc = Description::<dyn Gauge>::builder()
            .register_self_dependent(gauge_ops::FORK)
            .unwrap()
            .build();
        let resolved =
            Description::dependent_for::<dyn Gauge>(&desc, &gauge_ops::FORK).expect("fork");
        assert!(Arc::ptr_eq(&resolved, &desc));
    }

    #[test]
    fn reregistering_overwrites() {
        let first = readings();
        let second = Description::<dyn Reading>::builder()
            .equality(FnPolicy::<dyn Reading, _>::new(
                "reading-by-value",
                |a, b| a.value() == b.value(),
            ))
            .build();
        let desc = Description::<dyn Gauge>::builder()
            .register_dependent(gauge_ops::SNAPSHOT, first)
            .unwrap()
            .register_dependent(gauge_ops::SNAPSHOT, Arc::clone(&second))
            .unwrap()
            .build();
        let resolved =
            Description::dependent_for::<dyn Reading>(&desc, &gauge_ops::SNAPSHOT).unwrap();
        assert!(Arc::ptr_eq(&resolved, &second));
        assert_eq!(desc.dependent_operations().count(), 1);
    }

    #[test]
    fn registration_rejects_foreign_operation() {
        let err = Description::<dyn Gauge>::builder()
            .register_dependent(reading_ops::VALUE, readings())
            .err()
            .expect("foreign operation");
        assert!(matches!(err, UsageError::UnknownOperation { capability: "Gauge", .. }));
    }

    #[test]
    fn registration_rejects_non_dependent_operation() {
        let err = Description::<dyn Gauge>::builder()
            .register_dependent(gauge_ops::READ, readings())
            .err()
            .expect("read returns a plain value");
        assert!(matches!(err, UsageError::NotDependent { .. }));
    }

    #[test]
    fn registration_rejects_wrong_child_capability() {
        let err = Description::<dyn Gauge>::builder()
            .register_dependent(gauge_ops::SNAPSHOT, Description::<dyn Gauge>::plain())
            .err()
            .expect("snapshot returns a Reading");
        assert_eq!(
            err,
            UsageError::IncompatibleDependent {
                operation: "Gauge::snapshot()".to_owned(),
                expected: "Reading",
                actual: "Gauge",
            }
        );
    }

    #[test]
    fn structural_equality() {
        let a = Description::<dyn Gauge>::plain();
        let b = Description::<dyn Gauge>::plain();
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);

        let with_dependent = Description::<dyn Gauge>::builder()
            .register_dependent(gauge_ops::SNAPSHOT, readings())
            .unwrap()
            .build();
        let with_equal_dependent = Description::<dyn Gauge>::builder()
            .register_dependent(gauge_ops::SNAPSHOT, readings())
            .unwrap()
            .build();
        assert_ne!(a, with_dependent);
        assert_eq!(with_dependent, with_equal_dependent);

        let other_policy = Description::<dyn Gauge>::builder()
            .equality(FnPolicy::<dyn Gauge, _>::new(
                "gauge-by-value",
                |a, b| a.read() == b.read(),
            ))
            .build();
        assert_ne!(a, other_policy);
    }

    #[test]
    fn self_references_compare_structurally() {
        let a = Description::<dyn Gauge>::builder()
            .register_self_dependent(gauge_ops::FORK)
            .unwrap()
            .build();
        let b = Description::<dyn Gauge>::builder()
            .register_self_dependent(gauge_ops::FORK)
            .unwrap()
            .build();
        assert_eq!(a, b);
    }

    #[test]
    fn equal_descriptions_hash_equally() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
            let mut hasher = DefaultHasher::new();
            value.hash(&mut hasher);
            hasher.finish()
        }

        let a = Description::<dyn Gauge>::plain();
        let b = Description::<dyn Gauge>::plain();
        assert_eq!(hash_of(&*a), hash_of(&*b));
    }

    #[test]
    fn debug_lists_dependents() {
        let desc = Description::<dyn Gauge>::builder()
            .register_dependent(gauge_ops::SNAPSHOT, readings())
            .unwrap()
            .register_self_dependent(gauge_ops::FORK)
            .unwrap()
            .build();
        let rendered = format!("{desc:?}");
        assert!(rendered.contains("Gauge::snapshot()"), "{rendered}");
        assert!(rendered.contains("<self>"), "{rendered}");
    }
}
