//! Startup registry for named options, keyed singletons and hosted services.
//!
//! Configuration happens in two phases. While declaring, callers hold a
//! [`ServiceRegistry`] by `&mut` and queue configure actions against named
//! option slots. [`ServiceRegistry::build`] then freezes everything into a
//! [`ServiceProvider`], which replays the queued actions in registration order
//! whenever a named option value is requested and lazily creates keyed
//! singletons exactly once.

use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use indexmap::IndexSet;
use once_cell::sync::OnceCell;

use crate::error::{HostingError, Result};

type AnyArc = Arc<dyn Any + Send + Sync>;
type SlotKey = (TypeId, String);
type ErasedAction = Arc<dyn Fn(&mut dyn Any, &ServiceProvider) + Send + Sync>;
type SingletonFactory = Arc<dyn Fn(&ServiceProvider) -> Result<AnyArc> + Send + Sync>;

#[derive(Clone)]
struct KeyedRegistration {
    type_name: &'static str,
    factory: SingletonFactory,
}

/// Mutable registry populated during application startup.
#[derive(Default)]
pub struct ServiceRegistry {
    options: HashMap<SlotKey, Vec<ErasedAction>>,
    keyed: HashMap<SlotKey, KeyedRegistration>,
    services: HashMap<TypeId, AnyArc>,
    hosted: IndexSet<String>,
    guarded: IndexSet<String>,
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("option_slots", &self.options.len())
            .field("keyed_singletons", &self.keyed.len())
            .field("services", &self.services.len())
            .field("hosted", &self.hosted)
            .field("guarded", &self.guarded)
            .finish()
    }
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
            && self.keyed.is_empty()
            && self.services.is_empty()
            && self.hosted.is_empty()
            && self.guarded.is_empty()
    }

    /// Returns a builder for the option slot `name` of type `T`, creating the
    /// slot if it does not exist yet.
    pub fn add_options<T>(&mut self, name: impl Into<String>) -> OptionsBuilder<'_, T>
    where
        T: Default + Send + Sync + 'static,
    {
        let name = name.into();
        self.options
            .entry((TypeId::of::<T>(), name.clone()))
            .or_default();
        OptionsBuilder {
            name,
            services: self,
            _options: PhantomData,
        }
    }

    /// Whether an option slot `name` of type `T` exists.
    pub fn has_options<T: 'static>(&self, name: &str) -> bool {
        self.options
            .contains_key(&(TypeId::of::<T>(), name.to_owned()))
    }

    /// Number of configure actions queued on the option slot `name`.
    pub fn configure_action_count<T: 'static>(&self, name: &str) -> usize {
        self.options
            .get(&(TypeId::of::<T>(), name.to_owned()))
            .map_or(0, Vec::len)
    }

    /// Registers a keyed singleton factory unless one already exists for
    /// `(T, key)`. Returns `true` when the factory was added.
    pub fn try_add_keyed_singleton<T, F>(&mut self, key: impl Into<String>, factory: F) -> bool
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        let slot = (TypeId::of::<T>(), key.into());
        if self.keyed.contains_key(&slot) {
            return false;
        }

        let factory: SingletonFactory = Arc::new(move |provider: &ServiceProvider| {
            factory(provider).map(|value| Arc::new(value) as AnyArc)
        });
        self.keyed.insert(
            slot,
            KeyedRegistration {
                type_name: type_name::<T>(),
                factory,
            },
        );
        true
    }

    /// Whether a keyed singleton of type `T` is registered under `key`.
    pub fn has_keyed_singleton<T: 'static>(&self, key: &str) -> bool {
        self.keyed.contains_key(&(TypeId::of::<T>(), key.to_owned()))
    }

    /// Registers (or replaces) an unkeyed singleton instance.
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.services.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    /// Adds a hosted service by name. Returns `false` if it was already present.
    pub fn add_hosted(&mut self, name: impl Into<String>) -> bool {
        self.hosted.insert(name.into())
    }

    /// Whether a hosted service named `name` was added.
    pub fn is_hosted(&self, name: &str) -> bool {
        self.hosted.contains(name)
    }

    /// Marks `name` as configured under duplicate protection. Returns `false`
    /// if it was already marked.
    pub(crate) fn guard(&mut self, name: impl Into<String>) -> bool {
        self.guarded.insert(name.into())
    }

    /// Whether `name` was configured under duplicate protection.
    pub fn is_guarded(&self, name: &str) -> bool {
        self.guarded.contains(name)
    }

    /// Hosted service names in registration order.
    pub fn hosted(&self) -> impl Iterator<Item = &str> {
        self.hosted.iter().map(String::as_str)
    }

    fn push_action<T: 'static>(&mut self, name: &str, action: ErasedAction) {
        self.options
            .entry((TypeId::of::<T>(), name.to_owned()))
            .or_default()
            .push(action);
    }

    /// Ends the declaration phase.
    pub fn build(self) -> ServiceProvider {
        let keyed = self
            .keyed
            .into_iter()
            .map(|(slot, registration)| {
                (
                    slot,
                    KeyedSingleton {
                        registration,
                        instance: OnceCell::new(),
                    },
                )
            })
            .collect();

        tracing::debug!(
            option_slots = self.options.len(),
            hosted = self.hosted.len(),
            "service registry materialized"
        );

        ServiceProvider {
            inner: Arc::new(ProviderInner {
                options: self.options,
                keyed,
                services: self.services,
                hosted: self.hosted,
            }),
        }
    }
}

/// Queues configure actions against one named option slot.
pub struct OptionsBuilder<'a, T> {
    name: String,
    services: &'a mut ServiceRegistry,
    _options: PhantomData<fn(&mut T)>,
}

impl<T> fmt::Debug for OptionsBuilder<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsBuilder")
            .field("options", &type_name::<T>())
            .field("name", &self.name)
            .finish()
    }
}

impl<'a, T> OptionsBuilder<'a, T>
where
    T: Default + Send + Sync + 'static,
{
    /// The option slot name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registry this builder queues actions on.
    pub fn services(&mut self) -> &mut ServiceRegistry {
        self.services
    }

    /// Queues an action run against the option value when it is materialized.
    pub fn configure<F>(&mut self, action: F) -> &mut Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.configure_with_provider(move |options, _| action(options))
    }

    /// Like [`Self::configure`], but the action also receives the provider.
    pub fn configure_with_provider<F>(&mut self, action: F) -> &mut Self
    where
        F: Fn(&mut T, &ServiceProvider) + Send + Sync + 'static,
    {
        let erased: ErasedAction =
            Arc::new(move |options: &mut dyn Any, provider: &ServiceProvider| {
                if let Some(options) = options.downcast_mut::<T>() {
                    action(options, provider);
                }
            });
        self.services.push_action::<T>(&self.name, erased);
        tracing::trace!(options = type_name::<T>(), name = %self.name, "queued configure action");
        self
    }
}

struct KeyedSingleton {
    registration: KeyedRegistration,
    instance: OnceCell<AnyArc>,
}

struct ProviderInner {
    options: HashMap<SlotKey, Vec<ErasedAction>>,
    keyed: HashMap<SlotKey, KeyedSingleton>,
    services: HashMap<TypeId, AnyArc>,
    hosted: IndexSet<String>,
}

/// Read-only view of a built [`ServiceRegistry`].
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("option_slots", &self.inner.options.len())
            .field("keyed_singletons", &self.inner.keyed.len())
            .field("hosted", &self.inner.hosted)
            .finish()
    }
}

impl ServiceProvider {
    /// Materializes option slot `name`: starts from `T::default()` and runs
    /// every queued action in registration order.
    pub fn options<T: Default + 'static>(&self, name: &str) -> T {
        let mut options = T::default();
        if let Some(actions) = self.inner.options.get(&(TypeId::of::<T>(), name.to_owned())) {
            for action in actions {
                action(&mut options as &mut dyn Any, self);
            }
        }
        options
    }

    /// Resolves the keyed singleton `(T, key)`, creating it on first use.
    pub fn keyed_service<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>> {
        let singleton = self
            .inner
            .keyed
            .get(&(TypeId::of::<T>(), key.to_owned()))
            .ok_or_else(|| HostingError::ServiceNotRegistered {
                service: type_name::<T>(),
                key: key.to_owned(),
            })?;

        let instance = singleton
            .instance
            .get_or_try_init(|| {
                tracing::debug!(
                    service = singleton.registration.type_name,
                    key,
                    "creating keyed singleton"
                );
                (singleton.registration.factory)(self)
            })?
            .clone();

        instance
            .downcast::<T>()
            .map_err(|_| HostingError::ServiceTypeMismatch {
                expected: type_name::<T>(),
                key: key.to_owned(),
            })
    }

    /// Returns the unkeyed singleton of type `T`, if one was registered.
    pub fn service<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner
            .services
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Whether a hosted service named `name` was declared.
    pub fn is_hosted(&self, name: &str) -> bool {
        self.inner.hosted.contains(name)
    }

    /// Hosted service names in registration order.
    pub fn hosted(&self) -> impl Iterator<Item = &str> {
        self.inner.hosted.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Settings {
        host: String,
        steps: Vec<&'static str>,
    }

    #[test]
    fn actions_run_in_registration_order() {
        let mut registry = ServiceRegistry::new();
        registry
            .add_options::<Settings>("orders")
            .configure(|s| s.steps.push("first"))
            .configure(|s| {
                s.steps.push("second");
                s.host = "a".into();
            });
        registry
            .add_options::<Settings>("orders")
            .configure(|s| {
                s.steps.push("third");
                s.host = "b".into();
            });

        assert_eq!(registry.configure_action_count::<Settings>("orders"), 3);
        let provider = registry.build();
        let settings = provider.options::<Settings>("orders");
        assert_eq!(settings.steps, vec!["first", "second", "third"]);
        assert_eq!(settings.host, "b");
    }

    #[test]
    fn unknown_slots_materialize_as_default() {
        let provider = ServiceRegistry::new().build();
        assert_eq!(provider.options::<Settings>("missing"), Settings::default());
    }

    #[test]
    fn slots_are_separated_by_name_and_type() {
        let mut registry = ServiceRegistry::new();
        registry
            .add_options::<Settings>("a")
            .configure(|s| s.host = "a".into());
        registry.add_options::<String>("a").configure(|s| s.push('x'));

        assert!(registry.has_options::<Settings>("a"));
        assert!(!registry.has_options::<Settings>("b"));

        let provider = registry.build();
        assert_eq!(provider.options::<Settings>("a").host, "a");
        assert_eq!(provider.options::<Settings>("b").host, "");
        assert_eq!(provider.options::<String>("a"), "x");
    }

    #[test]
    fn provider_aware_actions_see_registered_services() {
        let mut registry = ServiceRegistry::new();
        registry.add_singleton(String::from("from-service"));
        registry
            .add_options::<Settings>("orders")
            .configure_with_provider(|s, provider| {
                if let Some(value) = provider.service::<String>() {
                    s.host = String::clone(&value);
                }
            });

        let provider = registry.build();
        assert_eq!(provider.options::<Settings>("orders").host, "from-service");
    }

    #[test]
    fn keyed_singletons_are_created_once() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);

        let mut registry = ServiceRegistry::new();
        assert!(registry.try_add_keyed_singleton("orders", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(String::from("first"))
        }));
        assert!(!registry.try_add_keyed_singleton("orders", |_| Ok(String::from("second"))));
        assert!(registry.has_keyed_singleton::<String>("orders"));

        let provider = registry.build();
        let a = provider.keyed_service::<String>("orders").unwrap();
        let b = provider.keyed_service::<String>("orders").unwrap();
        assert_eq!(a.as_str(), "first");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_keyed_singleton_is_reported() {
        let provider = ServiceRegistry::new().build();
        let err = provider.keyed_service::<String>("orders").unwrap_err();
        assert!(matches!(err, HostingError::ServiceNotRegistered { .. }));
    }

    #[test]
    fn factory_errors_propagate_and_are_retried() {
        let mut registry = ServiceRegistry::new();
        registry.try_add_keyed_singleton::<String, _>("orders", |_| {
            Err(HostingError::UnknownWorker("orders".into()))
        });

        let provider = registry.build();
        for _ in 0..2 {
            assert!(matches!(
                provider.keyed_service::<String>("orders"),
                Err(HostingError::UnknownWorker(_))
            ));
        }
    }

    #[test]
    fn hosted_names_keep_registration_order() {
        let mut registry = ServiceRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.add_hosted("b"));
        assert!(registry.add_hosted("a"));
        assert!(!registry.add_hosted("b"));
        assert!(!registry.is_empty());

        let provider = registry.build();
        assert_eq!(provider.hosted().collect::<Vec<_>>(), vec!["b", "a"]);
        assert!(provider.is_hosted("a"));
    }

    #[test]
    fn guards_are_tracked_apart_from_keyed_singletons() {
        let mut registry = ServiceRegistry::new();
        assert!(!registry.is_guarded("orders"));
        assert!(registry.guard("orders"));
        assert!(!registry.guard("orders"));

        assert!(registry.is_guarded("orders"));
        assert!(!registry.is_guarded("billing"));
        assert!(!registry.is_empty());
        assert!(!registry.has_keyed_singleton::<()>("orders"));
    }
}
