use std::any::Any;
use std::f64::consts::PI;
use std::rc::Rc;

use kinema::{
    AnimGroup, Animation, DataUpdater, Interpolate, ItemData, KinemaError, KinemaResult,
    Point, Renderer, Timeline, TimelineConfig, Vec2,
};

struct Printer;

impl Renderer for Printer {
    fn name(&self) -> &str {
        "printer"
    }

    fn render(&self, data: &ItemData, sink: &mut dyn Any) -> KinemaResult<()> {
        let out = sink
            .downcast_mut::<String>()
            .ok_or_else(|| KinemaError::validation("printer renders into a String"))?;
        let p = data.points[0];
        out.push_str(&format!(" ({:.2}, {:.2})", p.x, p.y));
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut tl = Timeline::new(TimelineConfig::from_json_str(r#"{"fps":{"num":4,"den":1}}"#)?)?;
    let kind = tl.scene().builtins().item;
    tl.renderers_mut().register(kind, Rc::new(Printer));

    let planet = tl.spawn(ItemData::with_points(kind, vec![Point::new(2.0, 0.0)]))?;
    let moon = tl.spawn(ItemData::with_points(kind, vec![Point::new(3.0, 0.0)]))?;
    tl.scene_mut().add_child(planet, moon)?;
    tl.show(planet)?;

    tl.play(
        DataUpdater::new(planet, |d, p| {
            d.rotate_about(p.alpha * PI, Point::ORIGIN);
            Ok(())
        })
        .root_only(false)
        .run_time(2.0),
    )?;
    tl.play(AnimGroup::succession(vec![
        Box::new(Interpolate::new(planet, |d| d.shift(Vec2::new(0.0, 1.0)))),
        Box::new(Interpolate::new(moon, |d| d.shift(Vec2::new(0.0, -1.0)))),
    ]))?;

    for frame in tl.frames().frames() {
        let calls = tl.render_calls_at_frame(frame);
        let mut line = String::new();
        for call in &calls.calls {
            call.execute(&mut line)?;
        }
        println!("t={:.2}{line}", calls.t);
    }
    tl.cleanup();
    Ok(())
}
