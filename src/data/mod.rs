//! Built-in service catalog shipped with the app.

use crate::domain::model::{Category, ProviderRef, ServiceListing};

struct Seed {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    category: Category,
    hourly_rate: u32,
    provider: &'static str,
    avatar: &'static str,
    rating: u8,
    reviews: u32,
    location: &'static str,
    image: &'static str,
}

const SEEDS: &[Seed] = &[
    Seed {
        id: "1",
        title: "Logo & Brand Identity Design",
        description: "Professional logo design with a complete brand identity kit for small businesses and startups.",
        category: Category::Design,
        hourly_rate: 2,
        provider: "Ahmed Al-Harbi",
        avatar: "https://randomuser.me/api/portraits/men/32.jpg",
        rating: 5,
        reviews: 24,
        location: "Riyadh",
        image: "https://images.pexels.com/photos/196644/pexels-photo-196644.jpeg",
    },
    Seed {
        id: "2",
        title: "English Conversation Lessons",
        description: "Improve your spoken English with relaxed one-to-one conversation practice.",
        category: Category::Teaching,
        hourly_rate: 1,
        provider: "Sara Al-Qahtani",
        avatar: "https://randomuser.me/api/portraits/women/44.jpg",
        rating: 4,
        reviews: 18,
        location: "Jeddah",
        image: "https://images.pexels.com/photos/5212345/pexels-photo-5212345.jpeg",
    },
    Seed {
        id: "3",
        title: "Website Development",
        description: "Responsive websites built with modern frameworks, from landing pages to small shops.",
        category: Category::Programming,
        hourly_rate: 3,
        provider: "Khalid Al-Otaibi",
        avatar: "https://randomuser.me/api/portraits/men/46.jpg",
        rating: 5,
        reviews: 31,
        location: "Riyadh",
        image: "https://images.pexels.com/photos/1181671/pexels-photo-1181671.jpeg",
    },
    Seed {
        id: "4",
        title: "Arabic to English Translation",
        description: "Accurate translation of documents, CVs and academic papers between Arabic and English.",
        category: Category::Translation,
        hourly_rate: 2,
        provider: "Noura Al-Shehri",
        avatar: "https://randomuser.me/api/portraits/women/68.jpg",
        rating: 4,
        reviews: 12,
        location: "Dammam",
        image: "https://images.pexels.com/photos/267669/pexels-photo-267669.jpeg",
    },
    Seed {
        id: "5",
        title: "Content Writing & Copywriting",
        description: "Engaging blog posts, product descriptions and social media copy in Arabic or English.",
        category: Category::Writing,
        hourly_rate: 1,
        provider: "Faisal Al-Dossari",
        avatar: "https://randomuser.me/api/portraits/men/75.jpg",
        rating: 3,
        reviews: 9,
        location: "Jeddah",
        image: "https://images.pexels.com/photos/261662/pexels-photo-261662.jpeg",
    },
    Seed {
        id: "6",
        title: "Oud Lessons for Beginners",
        description: "Learn the basics of the oud: tuning, scales and your first traditional pieces.",
        category: Category::Music,
        hourly_rate: 2,
        provider: "Omar Al-Ghamdi",
        avatar: "https://randomuser.me/api/portraits/men/11.jpg",
        rating: 5,
        reviews: 15,
        location: "Mecca",
        image: "https://images.pexels.com/photos/4087991/pexels-photo-4087991.jpeg",
    },
    Seed {
        id: "7",
        title: "Traditional Cooking Classes",
        description: "Cook kabsa, jareesh and other traditional dishes step by step in your own kitchen.",
        category: Category::Cooking,
        hourly_rate: 2,
        provider: "Huda Al-Zahrani",
        avatar: "https://randomuser.me/api/portraits/women/21.jpg",
        rating: 4,
        reviews: 20,
        location: "Dammam",
        image: "https://images.pexels.com/photos/3184183/pexels-photo-3184183.jpeg",
    },
    Seed {
        id: "8",
        title: "Mobile App Prototyping",
        description: "Clickable UI prototypes for iOS and Android apps to validate your idea quickly.",
        category: Category::Design,
        hourly_rate: 4,
        provider: "Reem Al-Mutairi",
        avatar: "https://randomuser.me/api/portraits/women/12.jpg",
        rating: 4,
        reviews: 7,
        location: "Riyadh",
        image: "https://images.pexels.com/photos/196645/pexels-photo-196645.jpeg",
    },
    Seed {
        id: "9",
        title: "Math Tutoring",
        description: "High-school algebra, geometry and calculus tutoring with exam preparation.",
        category: Category::Teaching,
        hourly_rate: 1,
        provider: "Yousef Al-Anazi",
        avatar: "https://randomuser.me/api/portraits/men/52.jpg",
        rating: 5,
        reviews: 27,
        location: "Medina",
        image: "https://images.pexels.com/photos/6238297/pexels-photo-6238297.jpeg",
    },
];

pub fn builtin_listings() -> Vec<ServiceListing> {
    SEEDS
        .iter()
        .map(|seed| ServiceListing {
            id: seed.id.to_string(),
            title: seed.title.to_string(),
            description: seed.description.to_string(),
            category: seed.category,
            hourly_rate: seed.hourly_rate,
            provider: ProviderRef {
                name: seed.provider.to_string(),
                avatar: Some(seed.avatar.to_string()),
            },
            rating: seed.rating,
            reviews: seed.reviews,
            location: seed.location.to_string(),
            image: seed.image.to_string(),
        })
        .collect()
}
