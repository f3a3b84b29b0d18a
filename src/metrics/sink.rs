use super::MetricGroup;

/// Consumer of finished sample groups.
pub trait MetricSink {
    fn dispatch(&mut self, group: MetricGroup);
}

impl MetricSink for Vec<MetricGroup> {
    fn dispatch(&mut self, group: MetricGroup) {
        self.push(group);
    }
}

impl<S: MetricSink + ?Sized> MetricSink for &mut S {
    fn dispatch(&mut self, group: MetricGroup) {
        (**self).dispatch(group);
    }
}
