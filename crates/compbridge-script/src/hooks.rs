//! Hook slots, class instances and the post-commit work queue.
//!
//! Component instances are keyed by their render path. Hooks are
//! slot-indexed within an instance, so a component must call them in the
//! same order on every render.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::interpreter::{ErrorKind, Flow, Interpreter, own_entries};
use crate::value::{Function, FunctionKind, NativeFn, Value};

pub(crate) const INVALID_HOOK_CALL: &str =
    "Invalid hook call. Hooks can only be called inside of the body of a function component.";

enum Slot {
    State { value: Value, setter: Value },
    Ref(Value),
    Memo { deps: Option<Vec<Value>>, value: Value },
    Effect { deps: Option<Vec<Value>>, cleanup: Option<Value> },
}

struct ClassState {
    instance: Value,
    props: Value,
    state: Value,
}

#[derive(Default)]
struct Instance {
    slots: Vec<Slot>,
    class: Option<ClassState>,
}

struct Frame {
    path: Rc<str>,
    cursor: usize,
    effects: Vec<Pending>,
}

/// Work that runs after a render pass commits.
pub(crate) enum Pending {
    Effect {
        path: Rc<str>,
        index: usize,
        effect: Value,
    },
    Cleanup(Value),
    Lifecycle {
        instance: Value,
        method: &'static str,
        args: Vec<Value>,
    },
    Call {
        func: Value,
        this: Value,
    },
}

#[derive(Default)]
pub(crate) struct HookStore {
    instances: HashMap<Rc<str>, Instance>,
    frames: Vec<Frame>,
    seen: HashSet<Rc<str>>,
    pending: Vec<Pending>,
    dirty: bool,
    render_phase_update: bool,
}

/// Snapshot of a mounted class component handed to the renderer.
pub(crate) struct MountedClass {
    pub instance: Value,
    pub props: Value,
    pub state: Value,
}

impl HookStore {
    pub fn begin_pass(&mut self) {
        self.seen.clear();
        self.frames.clear();
    }

    /// Drop instances not rendered this pass, queueing their teardown ahead
    /// of the pass's own effects.
    pub fn end_pass(&mut self) {
        let stale: Vec<Rc<str>> = self
            .instances
            .keys()
            .filter(|path| !self.seen.contains(*path))
            .cloned()
            .collect();
        let mut teardown = Vec::new();
        for path in stale {
            let Some(instance) = self.instances.remove(&path) else {
                continue;
            };
            for slot in instance.slots {
                if let Slot::Effect {
                    cleanup: Some(cleanup),
                    ..
                } = slot
                {
                    teardown.push(Pending::Cleanup(cleanup));
                }
            }
            if let Some(class) = instance.class {
                teardown.push(Pending::Lifecycle {
                    instance: class.instance,
                    method: "componentWillUnmount",
                    args: Vec::new(),
                });
            }
        }
        if !teardown.is_empty() {
            teardown.append(&mut self.pending);
            self.pending = teardown;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn mark_seen(&mut self, path: &Rc<str>) {
        self.seen.insert(path.clone());
    }

    pub fn push_frame(&mut self, path: Rc<str>) {
        self.seen.insert(path.clone());
        self.instances.entry(path.clone()).or_default();
        self.frames.push(Frame {
            path,
            cursor: 0,
            effects: Vec::new(),
        });
    }

    /// Restart the current frame for a render-phase re-run.
    pub fn rewind_frame(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.cursor = 0;
            frame.effects.clear();
        }
    }

    /// Pop the current frame, returning the effects it queued.
    pub fn pop_frame(&mut self) -> Vec<Pending> {
        self.frames.pop().map(|f| f.effects).unwrap_or_default()
    }

    pub fn take_render_phase_update(&mut self) -> bool {
        std::mem::take(&mut self.render_phase_update)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn queue(&mut self, work: Pending) {
        self.pending.push(work);
    }

    pub fn queue_all(&mut self, work: Vec<Pending>) {
        self.pending.extend(work);
    }

    pub fn take_pending(&mut self) -> Vec<Pending> {
        std::mem::take(&mut self.pending)
    }

    pub fn mounted_class(&self, path: &str) -> Option<MountedClass> {
        let class = self.instances.get(path)?.class.as_ref()?;
        Some(MountedClass {
            instance: class.instance.clone(),
            props: class.props.clone(),
            state: class.state.clone(),
        })
    }

    pub fn store_class(&mut self, path: Rc<str>, instance: Value, props: Value, state: Value) {
        self.seen.insert(path.clone());
        self.instances.entry(path).or_default().class = Some(ClassState {
            instance,
            props,
            state,
        });
    }

    fn next_slot(&mut self) -> Option<(Rc<str>, usize)> {
        let frame = self.frames.last_mut()?;
        let index = frame.cursor;
        frame.cursor += 1;
        Some((frame.path.clone(), index))
    }

    fn slot(&self, path: &str, index: usize) -> Option<&Slot> {
        self.instances.get(path)?.slots.get(index)
    }

    fn slot_mut(&mut self, path: &str, index: usize) -> Option<&mut Slot> {
        self.instances.get_mut(path)?.slots.get_mut(index)
    }

    fn put_slot(&mut self, path: &Rc<str>, index: usize, slot: Slot) {
        let slots = &mut self.instances.entry(path.clone()).or_default().slots;
        if index < slots.len() {
            slots[index] = slot;
        } else {
            slots.push(slot);
        }
    }

    fn queue_effect(&mut self, work: Pending) {
        if let Some(frame) = self.frames.last_mut() {
            frame.effects.push(work);
        }
    }

    fn state_value(&self, path: &str, index: usize) -> Option<Value> {
        match self.slot(path, index)? {
            Slot::State { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    fn update_state(&mut self, path: &str, index: usize, next: Value) {
        let rendering_self = self.frames.last().is_some_and(|f| &*f.path == path);
        let Some(Slot::State { value, .. }) = self.slot_mut(path, index) else {
            return;
        };
        if value.same_value(&next) {
            return;
        }
        *value = next;
        if rendering_self {
            self.render_phase_update = true;
        } else {
            self.dirty = true;
        }
    }

    fn take_cleanup(&mut self, path: &str, index: usize) -> Option<Value> {
        match self.slot_mut(path, index)? {
            Slot::Effect { cleanup, .. } => cleanup.take(),
            _ => None,
        }
    }

    fn set_cleanup(&mut self, path: &str, index: usize, value: Value) {
        if let Some(Slot::Effect { cleanup, .. }) = self.slot_mut(path, index) {
            *cleanup = Some(value);
        }
    }
}

/// Run one queued post-commit task.
pub(crate) fn run_pending(interp: &mut Interpreter, work: Pending) -> Flow<()> {
    match work {
        Pending::Effect {
            path,
            index,
            effect,
        } => {
            if let Some(cleanup) = interp.hooks.take_cleanup(&path, index) {
                interp.call(&cleanup, Value::Undefined, Vec::new())?;
            }
            let result = interp.call(&effect, Value::Undefined, Vec::new())?;
            if result.is_callable() {
                interp.hooks.set_cleanup(&path, index, result);
            }
        }
        Pending::Cleanup(cleanup) => {
            interp.call(&cleanup, Value::Undefined, Vec::new())?;
        }
        Pending::Lifecycle {
            instance,
            method,
            args,
        } => {
            let func = interp.get_property(&instance, method)?;
            if func.is_callable() {
                interp.call(&func, instance, args)?;
            }
        }
        Pending::Call { func, this } => {
            interp.call(&func, this, Vec::new())?;
        }
    }
    Ok(())
}

fn next_slot(interp: &mut Interpreter) -> Flow<(Rc<str>, usize)> {
    match interp.hooks.next_slot() {
        Some(slot) => Ok(slot),
        None => Err(interp.throw(ErrorKind::Error, INVALID_HOOK_CALL)),
    }
}

fn deps_of(value: Option<&Value>) -> Option<Vec<Value>> {
    match value {
        Some(Value::Array(items)) => Some(items.borrow().clone()),
        _ => None,
    }
}

fn deps_changed(prev: Option<&Vec<Value>>, next: Option<&Vec<Value>>) -> bool {
    match (prev, next) {
        (Some(prev), Some(next)) => {
            prev.len() != next.len() || prev.iter().zip(next).any(|(a, b)| !a.same_value(b))
        }
        _ => true,
    }
}

fn native(name: &str, func: Rc<NativeFn>) -> Value {
    Value::Function(Function::new(FunctionKind::Native {
        name: name.into(),
        func,
        parent: None,
    }))
}

fn make_setter(path: Rc<str>, index: usize, reducer: Option<Value>) -> Value {
    let func: Rc<NativeFn> = Rc::new(move |interp: &mut Interpreter, _this: Value, args: Vec<Value>| {
        let action = args.into_iter().next().unwrap_or_default();
        let Some(current) = interp.hooks.state_value(&path, index) else {
            return Ok(Value::Undefined);
        };
        let next = match &reducer {
            Some(reducer) => interp.call(reducer, Value::Undefined, vec![current, action])?,
            None => {
                if let Value::Function(f) = &action {
                    interp.call_function(f, Value::Undefined, vec![current])?
                } else {
                    action
                }
            }
        };
        interp.hooks.update_state(&path, index, next);
        Ok(Value::Undefined)
    });
    native("dispatch", func)
}

pub(crate) fn use_state(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let (path, index) = next_slot(interp)?;
    if let Some(Slot::State { value, setter }) = interp.hooks.slot(&path, index) {
        return Ok(Value::array(vec![value.clone(), setter.clone()]));
    }
    let init = args.into_iter().next().unwrap_or_default();
    let value = match &init {
        Value::Function(f) => interp.call_function(f, Value::Undefined, Vec::new())?,
        _ => init,
    };
    let setter = make_setter(path.clone(), index, None);
    interp.hooks.put_slot(
        &path,
        index,
        Slot::State {
            value: value.clone(),
            setter: setter.clone(),
        },
    );
    Ok(Value::array(vec![value, setter]))
}

pub(crate) fn use_reducer(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let (path, index) = next_slot(interp)?;
    if let Some(Slot::State { value, setter }) = interp.hooks.slot(&path, index) {
        return Ok(Value::array(vec![value.clone(), setter.clone()]));
    }
    let mut args = args.into_iter();
    let reducer = args.next().unwrap_or_default();
    let init = args.next().unwrap_or_default();
    let value = match args.next() {
        Some(init_fn @ Value::Function(_)) => interp.call(&init_fn, Value::Undefined, vec![init])?,
        _ => init,
    };
    let dispatch = make_setter(path.clone(), index, Some(reducer));
    interp.hooks.put_slot(
        &path,
        index,
        Slot::State {
            value: value.clone(),
            setter: dispatch.clone(),
        },
    );
    Ok(Value::array(vec![value, dispatch]))
}

pub(crate) fn use_effect(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let (path, index) = next_slot(interp)?;
    let effect = args.first().cloned().unwrap_or_default();
    let deps = deps_of(args.get(1));
    let changed = match interp.hooks.slot_mut(&path, index) {
        Some(Slot::Effect { deps: prev, .. }) => {
            let changed = deps_changed(prev.as_ref(), deps.as_ref());
            if changed {
                *prev = deps;
            }
            changed
        }
        _ => {
            interp.hooks.put_slot(&path, index, Slot::Effect { deps, cleanup: None });
            true
        }
    };
    if changed && effect.is_callable() {
        interp.hooks.queue_effect(Pending::Effect {
            path,
            index,
            effect,
        });
    }
    Ok(Value::Undefined)
}

pub(crate) fn use_ref(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let (path, index) = next_slot(interp)?;
    if let Some(Slot::Ref(obj)) = interp.hooks.slot(&path, index) {
        return Ok(obj.clone());
    }
    let initial = args.into_iter().next().unwrap_or_default();
    let obj = Value::object(vec![("current".into(), initial)]);
    interp.hooks.put_slot(&path, index, Slot::Ref(obj.clone()));
    Ok(obj)
}

fn memoize(interp: &mut Interpreter, deps: Option<Vec<Value>>, compute: Value, call: bool) -> Flow<Value> {
    let (path, index) = next_slot(interp)?;
    if let Some(Slot::Memo { deps: prev, value }) = interp.hooks.slot(&path, index)
        && deps.is_some()
        && !deps_changed(prev.as_ref(), deps.as_ref())
    {
        return Ok(value.clone());
    }
    let value = if call {
        interp.call(&compute, Value::Undefined, Vec::new())?
    } else {
        compute
    };
    interp.hooks.put_slot(
        &path,
        index,
        Slot::Memo {
            deps,
            value: value.clone(),
        },
    );
    Ok(value)
}

pub(crate) fn use_memo(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let deps = deps_of(args.get(1));
    let compute = args.into_iter().next().unwrap_or_default();
    memoize(interp, deps, compute, true)
}

pub(crate) fn use_callback(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let deps = deps_of(args.get(1));
    let callback = args.into_iter().next().unwrap_or_default();
    memoize(interp, deps, callback, false)
}

/// `Component.prototype.setState`. Merges into a fresh state object so the
/// previous state stays intact for `componentDidUpdate`.
pub(crate) fn set_state(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    if !matches!(this, Value::Object(_)) {
        return Ok(Value::Undefined);
    }
    let current = interp.get_property(&this, "state")?;
    let mut partial = args.first().cloned().unwrap_or_default();
    if let Value::Function(updater) = &partial {
        let props = interp.get_property(&this, "props")?;
        partial = interp.call_function(updater, this.clone(), vec![current.clone(), props])?;
    }
    if !partial.is_nullish() {
        let mut merged = own_entries(&current);
        for (key, value) in own_entries(&partial) {
            match merged.iter_mut().find(|(k, _)| *k == key) {
                Some((_, slot)) => *slot = value,
                None => merged.push((key, value)),
            }
        }
        interp.set_property(&this, "state", Value::object(merged))?;
        interp.hooks.mark_dirty();
    }
    if let Some(callback @ Value::Function(_)) = args.get(1) {
        interp.hooks.queue(Pending::Call {
            func: callback.clone(),
            this,
        });
    }
    Ok(Value::Undefined)
}

pub(crate) fn force_update(interp: &mut Interpreter, _this: Value, _args: Vec<Value>) -> Flow<Value> {
    interp.hooks.mark_dirty();
    Ok(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deps_comparison() {
        let a = vec![Value::Number(1.0), Value::string("x")];
        let b = vec![Value::Number(1.0), Value::string("x")];
        let c = vec![Value::Number(2.0), Value::string("x")];
        assert!(!deps_changed(Some(&a), Some(&b)));
        assert!(deps_changed(Some(&a), Some(&c)));
        assert!(deps_changed(None, Some(&a)));
        assert!(deps_changed(Some(&a), None));
        assert!(!deps_changed(Some(&vec![]), Some(&vec![])));
    }

    #[test]
    fn test_stale_instances_queue_teardown_first() {
        let mut store = HookStore::default();
        let path: Rc<str> = "root:App".into();
        store.push_frame(path.clone());
        store.put_slot(
            &path,
            0,
            Slot::Effect {
                deps: None,
                cleanup: Some(Value::string("cleanup")),
            },
        );
        store.pop_frame();
        store.queue(Pending::Call {
            func: Value::string("later"),
            this: Value::Undefined,
        });

        store.begin_pass();
        store.end_pass();

        let pending = store.take_pending();
        assert_eq!(pending.len(), 2);
        assert!(matches!(&pending[0], Pending::Cleanup(v) if v.to_js_string() == "cleanup"));
        assert!(store.instances.is_empty());
    }

    #[test]
    fn test_state_update_outside_render_marks_dirty() {
        let mut store = HookStore::default();
        let path: Rc<str> = "root:Counter".into();
        store.put_slot(
            &path,
            0,
            Slot::State {
                value: Value::Number(0.0),
                setter: Value::Undefined,
            },
        );
        store.update_state(&path, 0, Value::Number(0.0));
        assert!(!store.take_dirty());
        store.update_state(&path, 0, Value::Number(1.0));
        assert!(store.take_dirty());
        assert_eq!(store.state_value(&path, 0).unwrap().to_number(), 1.0);
    }

    #[test]
    fn test_state_update_while_rendering_self() {
        let mut store = HookStore::default();
        let path: Rc<str> = "root:Counter".into();
        store.push_frame(path.clone());
        store.put_slot(
            &path,
            0,
            Slot::State {
                value: Value::Number(0.0),
                setter: Value::Undefined,
            },
        );
        store.update_state(&path, 0, Value::Number(1.0));
        assert!(store.take_render_phase_update());
        assert!(!store.take_dirty());
    }
}
