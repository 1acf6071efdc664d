//! Timer - Periodic `ACTION_CB` driven by a driver timer.
//!
//! While running, the timer's serial holds the driver timer id and the
//! toolkit's timer table maps that id back to the control. A tick whose id
//! is no longer in the table (the timer was stopped or destroyed) is dropped
//! by [`Toolkit::fire_timer`].

use tracing::{debug, warn};

use crate::engine::{AttrFlags, ClassMethods, ControlClass, Handle, Toolkit};
use crate::error::Result;
use crate::types::NO_ID;

pub(crate) fn register(tk: &mut Toolkit) -> Result<()> {
    let mut class = ControlClass::new("timer").methods(ClassMethods {
        destroy: Some(stop),
        release: Some(release),
        ..Default::default()
    });
    let flags = AttrFlags::NOT_MAPPED | AttrFlags::NO_INHERIT;
    class.register_attribute("TIME", None, Some(set_time), None, flags | AttrFlags::NO_DEFAULT);
    class.register_attribute("RUN", Some(get_run), Some(set_run), None, flags | AttrFlags::NO_SAVE);
    class.register_attribute("WID", Some(get_wid), None, None, flags);
    tk.register_class(class)?;
    Ok(())
}

/// Driver timer ids start anywhere from 0; `NO_ID` marks a stopped timer.
fn is_running(tk: &Toolkit, h: Handle) -> bool {
    tk.serial(h) != NO_ID
}

fn start(tk: &mut Toolkit, h: Handle) -> bool {
    if is_running(tk, h) {
        return true;
    }
    let interval = tk.get_int(h, "TIME");
    if interval <= 0 {
        warn!(handle = %h, "timer without TIME not started");
        return false;
    }

    let Some(id) = tk.driver.timer_start(interval as u32) else {
        warn!(handle = %h, "driver refused timer");
        return false;
    };
    if let Some(control) = tk.control_mut(h) {
        control.serial = id;
    }
    tk.timer_table.insert(id, h);
    debug!(handle = %h, id, interval, "timer started");
    true
}

fn stop(tk: &mut Toolkit, h: Handle) {
    let id = tk.serial(h);
    if id == NO_ID {
        return;
    }
    tk.driver.timer_stop(id);
    tk.timer_table.remove(&id);
    if let Some(control) = tk.control_mut(h) {
        control.serial = NO_ID;
    }
    debug!(handle = %h, id, "timer stopped");
}

fn release(tk: &mut Toolkit) {
    tk.timer_table.clear();
}

/// A new interval restarts a running timer.
fn set_time(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    if is_running(tk, h) {
        stop(tk, h);
        tk.store_raw(h, "TIME", value);
        start(tk, h);
    }
    true
}

fn set_run(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    if value.is_some_and(crate::engine::attrib::parse_boolean) {
        start(tk, h);
    } else {
        stop(tk, h);
    }
    false
}

fn get_run(tk: &Toolkit, h: Handle) -> Option<String> {
    Some(crate::engine::attrib::bool_str(is_running(tk, h)).to_string())
}

fn get_wid(tk: &Toolkit, h: Handle) -> Option<String> {
    is_running(tk, h).then(|| tk.serial(h).to_string())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::driver::{HeadlessDriver, HeadlessProbe};
    use crate::engine::Toolkit;
    use crate::types::CallbackResult;

    fn toolkit() -> (Toolkit, HeadlessProbe) {
        let driver = HeadlessDriver::new();
        let probe = driver.probe();
        (Toolkit::with_driver(driver).unwrap(), probe)
    }

    #[test]
    fn test_run_requires_time() {
        let (mut tk, probe) = toolkit();
        let timer = tk.create("timer").unwrap();

        tk.set_attribute(timer, "RUN", Some("YES"));
        assert_eq!(tk.get_attribute(timer, "RUN").as_deref(), Some("NO"));
        assert!(probe.timers().is_empty());

        tk.set_attribute(timer, "TIME", Some("250"));
        tk.set_attribute(timer, "RUN", Some("YES"));
        assert_eq!(tk.get_attribute(timer, "RUN").as_deref(), Some("YES"));
        assert_eq!(probe.timers(), vec![(1, 250)]);
        assert_eq!(tk.serial(timer), 1);
        assert_eq!(tk.get_attribute(timer, "WID").as_deref(), Some("1"));

        tk.set_attribute(timer, "RUN", Some("NO"));
        assert!(probe.timers().is_empty());
        assert_eq!(tk.serial(timer), -1);
    }

    #[test]
    fn test_timer_id_zero_is_running() {
        let (mut tk, probe) = toolkit();
        probe.set_next_timer_id(0);
        let timer = tk.create("timer").unwrap();
        let ticks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&ticks);
        tk.set_callback(timer, "ACTION_CB", move |_, _, _| {
            counter.set(counter.get() + 1);
            CallbackResult::Default
        });

        tk.set_attributes(timer, "TIME=20, RUN=YES");
        assert_eq!(tk.serial(timer), 0);
        assert_eq!(tk.get_attribute(timer, "RUN").as_deref(), Some("YES"));
        assert_eq!(tk.get_attribute(timer, "WID").as_deref(), Some("0"));
        tk.fire_timer(0);
        assert_eq!(ticks.get(), 1);

        // a second RUN=YES must not start another driver timer
        tk.set_attribute(timer, "RUN", Some("YES"));
        assert_eq!(probe.timers(), vec![(0, 20)]);

        tk.set_attribute(timer, "RUN", Some("NO"));
        assert!(probe.timers().is_empty());
        assert_eq!(tk.get_attribute(timer, "RUN").as_deref(), Some("NO"));
        tk.fire_timer(0);
        assert_eq!(ticks.get(), 1);
    }

    #[test]
    fn test_ticks_call_action() {
        let (mut tk, _) = toolkit();
        let timer = tk.create("timer").unwrap();
        let ticks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&ticks);
        tk.set_callback(timer, "ACTION_CB", move |_, _, _| {
            counter.set(counter.get() + 1);
            CallbackResult::Default
        });
        tk.set_attributes(timer, "TIME=10, RUN=YES");

        let id = tk.serial(timer);
        tk.fire_timer(id);
        tk.fire_timer(id);
        assert_eq!(ticks.get(), 2);
        assert_eq!(tk.fire_timer(999), CallbackResult::Default);
    }

    #[test]
    fn test_changing_time_restarts() {
        let (mut tk, probe) = toolkit();
        let timer = tk.create("timer").unwrap();
        tk.set_attributes(timer, "TIME=10, RUN=YES");
        tk.set_attribute(timer, "TIME", Some("40"));

        assert_eq!(probe.timers(), vec![(2, 40)]);
        assert_eq!(tk.serial(timer), 2);
    }

    #[test]
    fn test_destroy_inside_tick() {
        let (mut tk, probe) = toolkit();
        let timer = tk.create("timer").unwrap();
        tk.set_callback(timer, "ACTION_CB", |tk, h, _| {
            tk.destroy(h);
            CallbackResult::Default
        });
        tk.set_attributes(timer, "TIME=5, RUN=YES");
        let id = tk.serial(timer);

        tk.fire_timer(id);
        assert!(!tk.is_alive(timer));
        assert!(probe.timers().is_empty());

        // A late tick for the dead timer is ignored
        assert_eq!(tk.fire_timer(id), CallbackResult::Default);
    }

    #[test]
    fn test_close_from_tick_exits_loop() {
        let (mut tk, probe) = toolkit();
        let timer = tk.create("timer").unwrap();
        tk.set_callback(timer, "ACTION_CB", |_, _, _| CallbackResult::Close);
        tk.set_attributes(timer, "TIME=5, RUN=YES");

        assert_eq!(tk.fire_timer(tk.serial(timer)), CallbackResult::Close);
        assert!(tk.exit_requested());
        assert_eq!(probe.exit_requests(), 1);
    }
}
