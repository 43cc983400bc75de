pub mod resource_kubernetes_project;

pub use resource_kubernetes_project::KubernetesProjectResource;
