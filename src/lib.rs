pub mod configuration;

pub mod magnet {
    pub mod conversion;
    pub mod excitation;
    pub mod magnet;
    pub mod magnetmanager;
}

pub mod manager {
    pub mod namedobject;
    pub mod managererror;
    pub mod manager;
}

pub mod math {
    pub mod cubicsegment;
    pub mod curve {
        pub mod curve;
        pub mod interpolation;
        pub mod nonparametriccurve {
            pub mod nonparametriccurve;
            pub mod piecewisepolynomial;
        }
    }
}

pub mod ramp {
    pub mod waveformerror;
    pub mod rampparameters;
    pub mod waveformparam;
    pub mod waveformdipole;
    pub mod waveform;
}
