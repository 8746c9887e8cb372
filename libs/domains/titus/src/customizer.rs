use protos::titus::JobDescriptor;

/// Hook that adjusts a job descriptor before submission.
///
/// Customizers run in registration order after the description has been
/// converted. Provenance labels are re-applied afterwards, so a customizer
/// cannot remove or rewrite them.
pub trait JobDescriptorCustomizer: Send + Sync {
    fn customize(&self, descriptor: &mut JobDescriptor);
}

impl<F> JobDescriptorCustomizer for F
where
    F: Fn(&mut JobDescriptor) + Send + Sync,
{
    fn customize(&self, descriptor: &mut JobDescriptor) {
        self(descriptor)
    }
}

/// Sets a container attribute on every submitted job
#[derive(Debug, Clone)]
pub struct ContainerAttribute {
    key: String,
    value: String,
}

impl ContainerAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl JobDescriptorCustomizer for ContainerAttribute {
    fn customize(&self, descriptor: &mut JobDescriptor) {
        descriptor
            .container
            .get_or_insert_with(Default::default)
            .attributes
            .insert(self.key.clone(), self.value.clone());
    }
}
