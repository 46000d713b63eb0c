//! Class kernel behaviour: inheritance, super calls, reopen, metaclasses

use corazon::{
    logging, property, Bundle, Class, ClassError, Definition, Function, Object, PropertyOptions,
    Property, Super, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Function that counts its calls and returns `result`
fn counting(result: &'static str) -> (Function, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let function = Function::new(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::from(result))
    });
    (function, calls)
}

fn super_only() -> Function {
    Function::new(|frame, args| frame.call_super(args))
}

fn empty() -> Definition {
    Definition::new()
}

// ============================================================================
// Instantiation and inheritance
// ============================================================================

#[test]
fn test_base_can_be_instantiated_without_extending() {
    let instance = Class::base().create(&[]).unwrap();
    assert!(instance.is_instance_of(&Class::base()));
}

#[test]
fn test_extend_depth_one() {
    let animal = Class::base().extend(empty()).unwrap();
    let animal_instance = animal.create(&[]).unwrap();
    assert!(animal_instance.is_instance_of(&animal));
    assert!(animal_instance.is_instance_of(&Class::base()));
}

#[test]
fn test_extend_depth_three() {
    let animal = Class::base().extend(empty()).unwrap();
    let dog = animal.extend(empty()).unwrap();
    let havanese = dog.extend(empty()).unwrap();
    let milo = havanese.create(&[]).unwrap();

    for class in [&havanese, &dog, &animal, &Class::base()] {
        assert!(milo.is_instance_of(class));
    }
    let unrelated = Class::base().extend(empty()).unwrap();
    assert!(!milo.is_instance_of(&unrelated));
}

#[test]
fn test_extend_chain_membership_is_transitive() {
    let mut chain = vec![Class::base()];
    for _ in 0..8 {
        let next = chain.last().unwrap().extend(empty()).unwrap();
        chain.push(next);
    }
    let leaf = chain.last().unwrap().create(&[]).unwrap();
    assert!(chain.iter().all(|class| leaf.is_instance_of(class)));
}

// ============================================================================
// Super calls
// ============================================================================

#[test]
fn test_can_call_super() {
    logging::init();
    let (speak, calls) = counting("speaking");
    let animal = Class::base()
        .extend(Bundle::new().with("speak", speak))
        .unwrap();
    let dog = animal
        .extend(Bundle::new().with("speak", super_only()))
        .unwrap();
    let havanese = dog
        .extend(Bundle::new().with("speak", super_only()))
        .unwrap();

    let milo = havanese.create(&[]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(milo.call("speak", &[]).unwrap(), Value::from("speaking"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_can_call_super_asynchronously() {
    let animal = Class::base()
        .extend(Bundle::new().method("speak", |_, args| {
            let callback = args[0].clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                if let Some(callback) = callback.as_function() {
                    let _ = callback.call(&[Value::Null, Value::from("speaking")]);
                }
            });
            Ok(Value::Undefined)
        }))
        .unwrap();
    let dog = animal
        .extend(Bundle::new().method("speak", |frame, args| {
            // must capture super
            let sup: Super = frame.super_().clone();
            let args = args.to_vec();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                let _ = sup.call(&args);
            });
            Ok(Value::Undefined)
        }))
        .unwrap();

    let (tx, rx) = oneshot::channel::<Value>();
    let tx = Arc::new(parking_lot::Mutex::new(Some(tx)));
    let callback = Function::new(move |_, args| {
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(args.get(1).cloned().unwrap_or_default());
        }
        Ok(Value::Undefined)
    });

    dog.create(&[])
        .unwrap()
        .call("speak", &[callback.into()])
        .unwrap();
    let message = rx.await.unwrap();
    assert_eq!(message, Value::from("speaking"));
}

#[test]
fn test_allows_apply_on_super() {
    let animal = Class::base()
        .extend(Bundle::new().method("speak", |_, _| Ok(Value::from("speaking"))))
        .unwrap();
    let dog = animal
        .extend(Bundle::new().method("speak", |frame, _| {
            frame.super_().apply(frame.this(), &[])
        }))
        .unwrap();
    let milo = dog.create(&[]).unwrap();
    assert_eq!(milo.call("speak", &[]).unwrap(), Value::from("speaking"));
}

#[test]
fn test_throws_when_super_apply_changes_this() {
    let animal = Class::base()
        .extend(Bundle::new().method("speak", |_, _| Ok(Value::from("speaking"))))
        .unwrap();
    let dog = animal
        .extend(Bundle::new().method("speak", |frame, _| {
            frame.super_().apply(&Object::plain().into(), &[])
        }))
        .unwrap();
    let milo = dog.create(&[]).unwrap();

    let err = milo.call("speak", &[]).unwrap_err();
    assert_eq!(err, ClassError::SuperRebound);
    let message = err.to_string();
    assert!(message.contains("cannot change `this`"));
    assert!(message.contains("_super.unbound"));
}

#[test]
fn test_allows_apply_on_unbound_super() {
    let animal = Class::base()
        .extend(
            Bundle::new()
                .with("word", "nothing")
                .method("speak", |frame, _| frame.get("word")),
        )
        .unwrap();
    let dog = animal
        .extend(Bundle::new().method("speak", |frame, _| {
            let other = Object::plain();
            other.set("word", "woof")?;
            frame.super_().unbound().apply(other.into(), &[])
        }))
        .unwrap();
    let milo = dog.create(&[]).unwrap();
    assert_eq!(milo.call("speak", &[]).unwrap(), Value::from("woof"));
}

#[test]
fn test_can_call_super_in_class_methods() {
    let (species, calls) = counting("animal");
    let animal = Class::base()
        .extend(empty().statics(Bundle::new().with("species", species)))
        .unwrap();
    let dog = animal
        .extend(empty().statics(Bundle::new().with("species", super_only())))
        .unwrap();
    let havanese = dog
        .extend(empty().statics(Bundle::new().with("species", super_only())))
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(havanese.call("species", &[]).unwrap(), Value::from("animal"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_can_call_super_in_class_methods_asynchronously() {
    let animal = Class::base()
        .extend(empty().statics(Bundle::new().method("species", |_, args| {
            let callback = args[0].clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                if let Some(callback) = callback.as_function() {
                    let _ = callback.call(&[Value::Null, Value::from("animal")]);
                }
            });
            Ok(Value::Undefined)
        })))
        .unwrap();
    let dog = animal
        .extend(empty().statics(Bundle::new().method("species", |frame, args| {
            let sup = frame.super_().clone();
            let args = args.to_vec();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                let _ = sup.call(&args);
            });
            Ok(Value::Undefined)
        })))
        .unwrap();

    let (tx, rx) = oneshot::channel::<Value>();
    let tx = Arc::new(parking_lot::Mutex::new(Some(tx)));
    let callback = Function::new(move |_, args| {
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(args.get(1).cloned().unwrap_or_default());
        }
        Ok(Value::Undefined)
    });

    dog.call("species", &[callback.into()]).unwrap();
    assert_eq!(rx.await.unwrap(), Value::from("animal"));
}

#[test]
fn test_static_super_receiver_is_the_subclass() {
    let animal = Class::base()
        .extend(empty().statics(Bundle::new().method("describe", |frame, _| {
            Ok(Value::from(frame.this().to_string()))
        })))
        .unwrap();
    let dog = animal
        .extend(
            empty()
                .named("ReceiverDog")
                .statics(Bundle::new().with("describe", super_only())),
        )
        .unwrap();
    assert_eq!(
        dog.call("describe", &[]).unwrap(),
        Value::from("[ReceiverDog Class]")
    );
}

#[test]
fn test_can_call_super_when_it_may_not_exist() {
    let (after, after_calls) = counting("after");
    let (before, before_calls) = counting("before");
    let speak_calls = Arc::new(AtomicUsize::new(0));
    let counter = speak_calls.clone();

    let dog = Class::base()
        .extend(Bundle::new().method("speak", move |frame, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            frame.call_super(&[])
        }))
        .unwrap();

    // notify of speak changes
    dog.reopen(Bundle::new().method("speak", |frame, _| {
        frame.call("beforeSpeak", &[])?;
        frame.call_super(&[])?;
        frame.call("afterSpeak", &[])?;
        Ok(Value::Undefined)
    }))
    .unwrap();
    dog.reopen(Bundle::new().with("afterSpeak", after)).unwrap();
    dog.reopen(Bundle::new().with("beforeSpeak", before)).unwrap();

    dog.create(&[]).unwrap().call("speak", &[]).unwrap();

    assert_eq!(speak_calls.load(Ordering::SeqCst), 1);
    assert_eq!(after_calls.load(Ordering::SeqCst), 1);
    assert_eq!(before_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_copies_function_attributes_to_the_wrapper() {
    let method = Function::new(|_, _| Ok(Value::Undefined)).with_attribute("testing", "Example");
    let person = Class::base()
        .extend(
            empty()
                .include(Bundle::new().with("method", method.clone()))
                .statics(Bundle::new().with("method", method)),
        )
        .unwrap();

    let instance_method = person.create(&[]).unwrap().get("method").unwrap();
    let static_method = person.get("method").unwrap();
    for wrapped in [instance_method, static_method] {
        let wrapped = wrapped.as_function().unwrap().clone();
        assert!(wrapped.is_wrapper());
        assert_eq!(wrapped.attribute("testing"), Some(Value::from("Example")));
    }
}

#[test]
fn test_can_specify_methods() {
    let animal = Class::base()
        .extend(Bundle::new().method("speak", |_, _| Ok(Value::from("hi"))))
        .unwrap();
    assert_eq!(
        animal.create(&[]).unwrap().call("speak", &[]).unwrap(),
        Value::from("hi")
    );
}

#[test]
fn test_does_not_prevent_unbound_function_calls() {
    let dog = Class::base().extend(empty()).unwrap();
    dog.reopen(Bundle::new().method("noise", |_, _| Ok(Value::from("bark"))))
        .unwrap();
    let noise = dog.create(&[]).unwrap().get("noise").unwrap();
    assert_eq!(
        noise.as_function().unwrap().call(&[]).unwrap(),
        Value::from("bark")
    );
}

#[test]
fn test_does_not_prevent_unbound_static_function_calls() {
    let dog = Class::base().extend(empty()).unwrap();
    dog.reopen_class(Bundle::new().method("noise", |_, _| Ok(Value::from("bark"))))
        .unwrap();
    let noise = dog.get("noise").unwrap();
    assert_eq!(
        noise.as_function().unwrap().call(&[]).unwrap(),
        Value::from("bark")
    );
}

// ============================================================================
// Wrapping
// ============================================================================

#[test]
fn test_only_wraps_function_once() {
    let dog = Class::base().extend(empty()).unwrap();
    dog.reopen(Bundle::new().method("init", |_, _| Ok(Value::Undefined)))
        .unwrap();

    let init = dog.prototype().get("init").unwrap();
    let init = init.as_function().unwrap();
    let wrapped = init.wrapped_function().unwrap();
    assert!(wrapped.wrapped_function().is_none());
}

#[test]
fn test_stores_the_super_function_on_the_wrapper() {
    let animal = Class::base()
        .extend(Bundle::new().method("init", |_, _| Ok(Value::Undefined)))
        .unwrap();
    let dog = animal
        .extend(Bundle::new().method("init", |_, _| Ok(Value::Undefined)))
        .unwrap();

    let dog_init = dog.prototype().get("init").unwrap();
    let animal_init = animal.prototype().get("init").unwrap();
    let recorded = dog_init.as_function().unwrap().super_function().unwrap();
    assert!(recorded.ptr_eq(animal_init.as_function().unwrap()));
}

#[test]
fn test_reopen_adds_exactly_one_wrap_layer() {
    let dog = Class::base()
        .extend(Bundle::new().method("speak", |_, _| Ok(Value::from("woof"))))
        .unwrap();
    let before = dog.prototype().get("speak").unwrap();

    dog.reopen(Bundle::new().method("speak", |frame, _| {
        let inherited = frame.call_super(&[])?;
        Ok(Value::from(format!("{}!", inherited)))
    }))
    .unwrap();
    let after = dog.prototype().get("speak").unwrap();
    let after = after.as_function().unwrap();

    assert!(after.super_function().unwrap().ptr_eq(before.as_function().unwrap()));
    assert!(after.wrapped_function().unwrap().wrapped_function().is_none());
    assert_eq!(
        dog.create(&[]).unwrap().call("speak", &[]).unwrap(),
        Value::from("woof!")
    );
}

// ============================================================================
// Instance lifecycle
// ============================================================================

#[test]
fn test_can_specify_a_new_method() {
    let subclass = Class::base()
        .extend(Bundle::new().method("new", |frame, _| {
            frame.set("initialized", true)?;
            Ok(Value::Undefined)
        }))
        .unwrap();
    let obj = subclass.create(&[]).unwrap();
    assert_eq!(obj.get("initialized").unwrap(), Value::Bool(true));
}

#[test]
fn test_calls_new_methods_in_proper_sequence() {
    let sequence = Arc::new(AtomicUsize::new(0));
    let seq = sequence.clone();
    let animal = Class::base()
        .extend(Bundle::new().method("new", move |frame, _| {
            frame.set("animal", seq.fetch_add(1, Ordering::SeqCst) as f64)?;
            Ok(Value::Undefined)
        }))
        .unwrap();
    let seq = sequence.clone();
    let dog = animal
        .extend(Bundle::new().method("new", move |frame, _| {
            frame.set("dog", seq.fetch_add(1, Ordering::SeqCst) as f64)?;
            Ok(Value::Undefined)
        }))
        .unwrap();

    let instance = dog.create(&[]).unwrap();
    assert_eq!(instance.get("animal").unwrap(), Value::from(0));
    assert_eq!(instance.get("dog").unwrap(), Value::from(1));
}

#[test]
fn test_new_calling_super_runs_ancestor_once() {
    let (animal_new, animal_calls) = counting("animal");
    let animal = Class::base()
        .extend(Bundle::new().with("new", animal_new))
        .unwrap();
    let dog = animal
        .extend(Bundle::new().method("new", |frame, args| {
            frame.call_super(args)?;
            frame.set("dog", true)?;
            Ok(Value::Undefined)
        }))
        .unwrap();

    let instance = dog.new_instance(&[]).unwrap();
    assert_eq!(animal_calls.load(Ordering::SeqCst), 1);
    assert_eq!(instance.get("dog").unwrap(), Value::Bool(true));

    dog.create(&[]).unwrap();
    assert_eq!(animal_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_can_specify_an_init_method() {
    let subclass = Class::base()
        .extend(Bundle::new().method("init", |frame, _| {
            frame.set("initialized", true)?;
            Ok(Value::Undefined)
        }))
        .unwrap();
    let obj = subclass.create(&[]).unwrap();
    assert_eq!(obj.get("initialized").unwrap(), Value::Bool(true));
}

#[test]
fn test_calls_init_methods_in_proper_sequence() {
    let sequence = Arc::new(AtomicUsize::new(0));
    let seq = sequence.clone();
    let animal = Class::base()
        .extend(Bundle::new().method("init", move |frame, _| {
            frame.set("animal", seq.fetch_add(1, Ordering::SeqCst) as f64)?;
            Ok(Value::Undefined)
        }))
        .unwrap();
    let seq = sequence.clone();
    let dog = animal
        .extend(Bundle::new().method("init", move |frame, _| {
            frame.call_super(&[])?;
            frame.set("dog", seq.fetch_add(1, Ordering::SeqCst) as f64)?;
            Ok(Value::Undefined)
        }))
        .unwrap();

    let instance = dog.create(&[]).unwrap();
    assert_eq!(instance.get("animal").unwrap(), Value::from(0));
    assert_eq!(instance.get("dog").unwrap(), Value::from(1));
}

#[test]
fn test_init_without_super_skips_ancestors() {
    let animal = Class::base()
        .extend(Bundle::new().method("init", |frame, _| {
            frame.set("animal", true)?;
            Ok(Value::Undefined)
        }))
        .unwrap();
    let dog = animal
        .extend(Bundle::new().method("init", |frame, _| {
            frame.set("dog", true)?;
            Ok(Value::Undefined)
        }))
        .unwrap();

    let instance = dog.create(&[]).unwrap();
    assert!(instance.get("animal").unwrap().is_undefined());
    assert_eq!(instance.get("dog").unwrap(), Value::Bool(true));
}

#[test]
fn test_init_receives_create_arguments() {
    let point = Class::base()
        .extend(Bundle::new().method("init", |frame, args| {
            frame.set("x", args[0].clone())?;
            frame.set("y", args[1].clone())?;
            Ok(Value::Undefined)
        }))
        .unwrap();
    let p = point.create(&[Value::from(1), Value::from(2)]).unwrap();
    assert_eq!(p.get("x").unwrap(), Value::from(1));
    assert_eq!(p.get("y").unwrap(), Value::from(2));
}

#[test]
fn test_can_be_created_uninitialized() {
    let (new_hook, new_calls) = counting("new");
    let (init, init_calls) = counting("init");
    let subclass = Class::base()
        .extend(Bundle::new().with("new", new_hook).with("init", init))
        .unwrap();

    let obj = subclass.new_instance(&[]).unwrap();
    assert!(obj.is_instance_of(&subclass));
    assert_eq!(new_calls.load(Ordering::SeqCst), 1);
    assert_eq!(init_calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Class-level members and identity
// ============================================================================

#[test]
fn test_static_members_are_accessible() {
    let animal = Class::base().extend(empty()).unwrap();
    let static_member = Object::plain();
    animal
        .reopen_class(Bundle::new().with("staticMember", static_member.clone()))
        .unwrap();
    assert_eq!(animal.get("staticMember").unwrap(), Value::from(static_member));
}

#[test]
fn test_static_members_are_accessible_via_subclasses() {
    let animal = Class::base().extend(empty()).unwrap();
    let dog = animal.extend(empty()).unwrap();
    let static_member = Object::plain();
    animal
        .reopen_class(Bundle::new().with("staticMember", static_member.clone()))
        .unwrap();

    assert_eq!(dog.get("staticMember").unwrap(), Value::from(static_member.clone()));
    assert_eq!(animal.get("staticMember").unwrap(), Value::from(static_member));
}

#[test]
fn test_reopen_is_visible_to_existing_instances() {
    let dog = Class::base().extend(empty()).unwrap();
    let existing = dog.create(&[]).unwrap();
    dog.reopen(Bundle::new().method("noise", |_, _| Ok(Value::from("bark"))))
        .unwrap();
    assert_eq!(existing.call("noise", &[]).unwrap(), Value::from("bark"));
}

#[test]
fn test_instances_know_their_identity() {
    let animal = Class::base().extend(empty()).unwrap();
    let dog = animal.extend(Bundle::new()).unwrap();
    let instance = dog.create(&[]).unwrap();
    assert!(instance.identity().unwrap().ptr_eq(&dog));
    assert!(instance.is_instance_of(&dog));
}

#[test]
fn test_instances_know_their_metaclass() {
    let animal = Class::base().extend(empty()).unwrap();
    let dog = animal.extend(Bundle::new()).unwrap();
    let instance = dog.create(&[]).unwrap();
    assert!(instance
        .metaclass()
        .unwrap()
        .ptr_eq(&dog.metaclass().unwrap()));
}

#[test]
fn test_class_knows_its_identity() {
    let dog = Class::base().extend(empty()).unwrap();
    assert!(dog.identity().ptr_eq(&dog));
}

#[test]
fn test_creates_valid_metaclass_prototype_chain() {
    let animal = Class::base().extend(empty().named("Animal")).unwrap();
    let dog = animal.extend(empty().named("Dog")).unwrap();

    let dog_meta_proto = dog.metaclass().unwrap().prototype().clone();
    assert!(dog_meta_proto.is_instance_of(&animal.metaclass().unwrap()));
    assert!(dog_meta_proto.is_instance_of(&Class::base().metaclass().unwrap()));
    assert!(Value::from(dog.clone()).is_instance_of(&dog.metaclass().unwrap()));
    assert!(Value::from(dog).is_instance_of(&animal.metaclass().unwrap()));
}

#[test]
fn test_has_descriptive_instances() {
    let animal = Class::base().extend(empty()).unwrap();
    let dog = animal.extend(empty().named("Dog")).unwrap();
    let instance = dog.create(&[]).unwrap();
    assert_eq!(instance.to_string(), "[Dog]");
    assert_eq!(Value::from(instance).to_string(), "[Dog]");
}

#[test]
fn test_has_descriptive_classes() {
    let animal = Class::base().extend(empty()).unwrap();
    let dog = animal.extend(empty().named("Dog")).unwrap();
    assert_eq!(dog.to_string(), "[Dog Class]");
    assert_eq!(Value::from(dog).to_string(), "[Dog Class]");
}

#[test]
fn test_anonymous_classes_use_the_marker() {
    let anonymous = Class::base().extend(empty()).unwrap();
    assert_eq!(anonymous.to_string(), "[Anonymous Class]");
    assert_eq!(anonymous.create(&[]).unwrap().to_string(), "[Anonymous]");
}

// ============================================================================
// Accessors
// ============================================================================

fn seeded_init() -> Function {
    Function::new(|frame, _| {
        frame.set("_type", "canine")?;
        Ok(Value::Undefined)
    })
}

#[test]
fn test_allows_getter_only_accessor_definition() {
    let dog = Class::base()
        .extend(
            Bundle::new()
                .with("init", seeded_init())
                .with("type", property(&[]).unwrap()),
        )
        .unwrap();
    let instance = dog.create(&[]).unwrap();
    assert_eq!(instance.get("type").unwrap(), Value::from("canine"));

    let err = instance.set("type", "animal").unwrap_err();
    assert_eq!(
        err,
        ClassError::PropertyNotWritable {
            name: "type".to_string()
        }
    );
    assert!(err.to_string().contains("only a getter"));
}

#[test]
fn test_allows_getter_setter_accessor_definition() {
    let dog = Class::base()
        .extend(
            Bundle::new()
                .with("init", seeded_init())
                .with("type", Property::new().options(PropertyOptions::default().writable(true))),
        )
        .unwrap();
    let instance = dog.create(&[]).unwrap();
    assert_eq!(instance.get("type").unwrap(), Value::from("canine"));

    instance.set("type", "animal").unwrap();
    assert_eq!(instance.get("type").unwrap(), Value::from("animal"));
    assert_eq!(instance.get("_type").unwrap(), Value::from("animal"));
}

#[test]
fn test_allows_custom_getter_only_accessor_definition() {
    let (getter, calls) = counting("custom");
    let dog = Class::base()
        .extend(Bundle::new().with("type", property(&[getter.into()]).unwrap()))
        .unwrap();
    let instance = dog.create(&[]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(instance.get("type").unwrap(), Value::from("custom"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_allows_custom_setter_only_accessor_definition() {
    let (setter, calls) = counting("ignored");
    let dog = Class::base()
        .extend(Bundle::new().with(
            "type",
            property(&[Value::Undefined, setter.into()]).unwrap(),
        ))
        .unwrap();
    let instance = dog.create(&[]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    instance.set("type", "canine").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
