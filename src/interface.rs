use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum InterfaceMode {
    #[default]
    Tcp,
    Simulation,
}

impl InterfaceMode {
    pub const fn requires_host(self) -> bool {
        match self {
            Self::Tcp => true,
            Self::Simulation => false,
        }
    }
}
