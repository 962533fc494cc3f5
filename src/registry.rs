//! Turn merged annotations into caller-defined objects.
//!
//! The engine does not know any annotation types itself. A caller supplies an
//! [`ObjectRegistry`] that can build an object for a name, and each built
//! object receives its arguments through [`AnnotationObject::set`].

use crate::error::{Error, Result};
use crate::scan::AnnotationSet;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// How an argument reaches an object: by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgKey {
    Index(usize),
    Name(String),
}

/// An object that accepts annotation arguments one at a time.
pub trait AnnotationObject {
    fn set(&mut self, key: ArgKey, value: Value);
}

impl<T: AnnotationObject + ?Sized> AnnotationObject for Box<T> {
    fn set(&mut self, key: ArgKey, value: Value) {
        (**self).set(key, value)
    }
}

/// Builds the object for an annotation name, if one is known.
pub trait ObjectRegistry {
    type Object: AnnotationObject;

    fn construct(&self, name: &str) -> Option<Self::Object>;
}

/// What to do with names the registry cannot build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Fail with [`Error::UnknownAnnotationKind`].
    Strict,
    /// Skip the name.
    #[default]
    Lenient,
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Registry backed by explicitly registered factories.
pub struct FactoryRegistry<T> {
    factories: HashMap<String, Factory<T>>,
}

impl<T> FactoryRegistry<T> {
    pub fn new() -> Self {
        FactoryRegistry {
            factories: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl<T> Default for FactoryRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FactoryRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FactoryRegistry").field("names", &names).finish()
    }
}

impl<T: AnnotationObject> ObjectRegistry for FactoryRegistry<T> {
    type Object = T;

    fn construct(&self, name: &str) -> Option<T> {
        self.factories.get(name).map(|factory| factory())
    }
}

/// A generic object that just records what it was given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub positional: Vec<Value>,
    pub named: IndexMap<String, Value>,
}

impl AnnotationObject for Attributes {
    fn set(&mut self, key: ArgKey, value: Value) {
        match key {
            ArgKey::Index(i) => {
                if i >= self.positional.len() {
                    self.positional.resize(i + 1, Value::String(String::new()));
                }
                self.positional[i] = value;
            }
            ArgKey::Name(name) => {
                self.named.insert(name, value);
            }
        }
    }
}

/// Build one object per annotation name and feed it every occurrence.
///
/// Map occurrences are applied key by key. Lists contribute each element and
/// scalars themselves as positional arguments, numbered per object in
/// source order.
pub fn materialize<R: ObjectRegistry>(
    annotations: &AnnotationSet,
    registry: &R,
    strictness: Strictness,
) -> Result<IndexMap<String, R::Object>> {
    let mut objects = IndexMap::new();

    for (name, occurrences) in annotations {
        let Some(mut object) = registry.construct(name) else {
            match strictness {
                Strictness::Strict => {
                    return Err(Error::UnknownAnnotationKind { name: name.clone() })
                }
                Strictness::Lenient => continue,
            }
        };

        let mut index = 0;
        for occurrence in occurrences {
            match occurrence {
                Value::Map(fields) => {
                    for (key, value) in fields {
                        object.set(ArgKey::Name(key.clone()), value.clone());
                    }
                }
                Value::List(items) => {
                    for item in items {
                        object.set(ArgKey::Index(index), item.clone());
                        index += 1;
                    }
                }
                scalar => {
                    object.set(ArgKey::Index(index), scalar.clone());
                    index += 1;
                }
            }
        }

        objects.insert(name.clone(), object);
    }

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan;

    #[derive(Debug, Default, PartialEq)]
    struct Route {
        name: String,
    }

    impl AnnotationObject for Route {
        fn set(&mut self, key: ArgKey, value: Value) {
            if key == ArgKey::Name("name".to_string()) {
                self.name = value.to_string();
            }
        }
    }

    #[derive(Debug, PartialEq)]
    enum Known {
        Route(Route),
        Any(Attributes),
    }

    impl AnnotationObject for Known {
        fn set(&mut self, key: ArgKey, value: Value) {
            match self {
                Known::Route(route) => route.set(key, value),
                Known::Any(attrs) => attrs.set(key, value),
            }
        }
    }

    fn registry() -> FactoryRegistry<Known> {
        let mut registry = FactoryRegistry::new();
        registry
            .register("ApiRoute", || Known::Route(Route::default()))
            .register("ApiMethod", || Known::Any(Attributes::default()));
        registry
    }

    #[test]
    fn builds_registered_kinds() {
        let set = scan(r#"/** @ApiRoute(name="/user") @ApiMethod(type="get") */"#).unwrap();
        let objects = materialize(&set, &registry(), Strictness::Strict).unwrap();

        assert_eq!(
            objects["ApiRoute"],
            Known::Route(Route {
                name: "/user".to_string()
            })
        );
        let Known::Any(method) = &objects["ApiMethod"] else {
            panic!("expected attributes");
        };
        assert_eq!(method.named.get("type"), Some(&Value::from("get")));
    }

    #[test]
    fn strict_rejects_unknown_names() {
        let set = scan("/** @ApiRoute(name=\"/a\") @Nope(1) */").unwrap();
        let err = materialize(&set, &registry(), Strictness::Strict).unwrap_err();
        assert_eq!(
            err,
            Error::UnknownAnnotationKind {
                name: "Nope".to_string()
            }
        );
    }

    #[test]
    fn lenient_skips_unknown_names() {
        let set = scan("/** @Nope(1) @ApiMethod(get) */").unwrap();
        let objects = materialize(&set, &registry(), Strictness::Lenient).unwrap();
        assert_eq!(objects.len(), 1);
        assert!(objects.contains_key("ApiMethod"));
    }

    #[test]
    fn positional_arguments_are_numbered_per_object() {
        let mut registry: FactoryRegistry<Attributes> = FactoryRegistry::new();
        registry.register("Tags", Attributes::default);

        let set = scan("/** @Tags(a, b) @Tags(c) @Tags(kind=\"x\") */").unwrap();
        let objects = materialize(&set, &registry, Strictness::Strict).unwrap();
        let tags = &objects["Tags"];

        assert_eq!(
            tags.positional,
            vec![Value::from("a"), Value::from("b"), Value::from("c")]
        );
        assert_eq!(tags.named.get("kind"), Some(&Value::from("x")));
    }

    #[test]
    fn boxed_objects_work_as_registry_output() {
        let mut registry: FactoryRegistry<Box<dyn AnnotationObject>> = FactoryRegistry::new();
        registry.register("ApiRoute", || {
            Box::new(Attributes::default()) as Box<dyn AnnotationObject>
        });
        assert!(registry.contains("ApiRoute"));

        let set = scan("/** @ApiRoute(name=\"/a\") */").unwrap();
        let objects = materialize(&set, &registry, Strictness::Strict).unwrap();
        assert_eq!(objects.len(), 1);
    }
}
